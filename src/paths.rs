//! XDG-style path utilities for the settings file.
//!
//! Paths follow XDG Base Directory conventions on every platform rather
//! than OS-specific locations.

use std::path::PathBuf;

/// Name of the settings file inside [`config_dir`].
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Returns the configuration directory for chatline.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/chatline` if `XDG_CONFIG_HOME` is set
/// 2. `~/.config/chatline` otherwise
///
/// # Panics
///
/// Panics if the home directory cannot be determined.
pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME").map_or_else(
        |_| home_dir().join(".config").join("chatline"),
        |xdg| PathBuf::from(xdg).join("chatline"),
    )
}

/// Returns the path of the settings file.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Returns the user's home directory.
///
/// # Panics
///
/// Panics if the home directory cannot be determined.
#[allow(clippy::expect_used)]
fn home_dir() -> PathBuf {
    dirs::home_dir().expect("Failed to determine home directory")
}
