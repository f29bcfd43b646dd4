//! Color and emphasis helpers for terminal output, using owo-colors.

use owo_colors::OwoColorize;
use std::fmt::Display;

/// Styles for different semantic elements.
pub struct Style;

impl Style {
    /// Section headers ("Settings", "Commands")
    pub fn header<T: Display>(text: T) -> String {
        format!("{}", text.bold())
    }

    /// Setting names
    pub fn label<T: Display>(text: T) -> String {
        format!("{}", text.dimmed())
    }

    /// Setting values, service and model names
    pub fn value<T: Display>(text: T) -> String {
        format!("{}", text.cyan())
    }

    /// Descriptions, endpoints and other supporting text
    pub fn secondary<T: Display>(text: T) -> String {
        format!("{}", text.dimmed())
    }

    pub fn success<T: Display>(text: T) -> String {
        format!("{}", text.green())
    }

    pub fn error<T: Display>(text: T) -> String {
        format!("{}", text.red().bold())
    }

    pub fn warning<T: Display>(text: T) -> String {
        format!("{}", text.yellow())
    }

    /// Slash commands ("/model", "/help")
    pub fn command<T: Display>(text: T) -> String {
        format!("{}", text.green())
    }

    pub fn link<T: Display>(text: T) -> String {
        format!("{}", text.blue().underline())
    }

    /// Hints and placeholders
    pub fn hint<T: Display>(text: T) -> String {
        format!("{}", text.dimmed().italic())
    }

    pub fn version<T: Display>(text: T) -> String {
        format!("{}", text.dimmed())
    }
}
