//! Settings display command handler.

use crate::chat::print_config;
use crate::config::ConfigManager;
use crate::ui::Style;

/// Prints the saved settings, or only the file path when `path_only` is set.
///
/// Missing or unreadable settings are replaced with defaults first, exactly
/// as starting a chat would.
pub fn print_settings(path_only: bool) {
    let manager = ConfigManager::new();

    if path_only {
        println!("{}", manager.config_path().display());
        return;
    }

    let config = manager.load_or_default();
    print_config(&config);
    println!(
        "{}",
        Style::hint(format!("Stored in {}", manager.config_path().display()))
    );
}
