use anyhow::Result;
use tracing::debug;

use crate::chat::{ChatSession, Repl};
use crate::config::ConfigManager;

/// Loads the saved settings and runs the interactive session.
pub async fn run_chat() -> Result<()> {
    let manager = ConfigManager::new();
    debug!(path = %manager.config_path().display(), "loading settings");
    let config = manager.load_or_default();

    let session = ChatSession::new(config, manager);
    Repl::new(session).run().await
}
