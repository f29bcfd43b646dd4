//! Settings model and the JSON file store behind it.

mod manager;
mod settings;

pub use manager::ConfigManager;
pub use settings::{Config, DEFAULT_HISTORY, DEFAULT_SYSTEM_PROMPT, Service};
