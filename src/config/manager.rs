use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::Config;
use crate::{fs as atomic_fs, paths};

/// Loads and saves the settings file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a config manager for the per-user settings file.
    ///
    /// Settings are stored at `$XDG_CONFIG_HOME/chatline/config.json`
    /// or `~/.config/chatline/config.json` if `XDG_CONFIG_HOME` is not set.
    pub fn new() -> Self {
        Self::with_path(paths::config_path())
    }

    /// Creates a config manager for an explicit settings file.
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Reads and validates the settings file.
    pub fn load(&self) -> Result<Config> {
        let contents = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config: Config =
            serde_json::from_str(&contents).with_context(|| "Failed to parse config file")?;

        if !config.is_valid() {
            bail!("Invalid history count {}, expected positive integer", config.history);
        }

        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

        atomic_fs::atomic_write(&self.config_path, &contents).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        debug!(path = %self.config_path.display(), "settings saved");
        Ok(())
    }

    /// Loads the settings, never failing.
    ///
    /// An absent file is created with defaults. A file that cannot be read,
    /// parsed or validated is replaced with defaults.
    pub fn load_or_default(&self) -> Config {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "no settings file, writing defaults");
            return self.reset_to_defaults();
        }

        match self.load() {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %self.config_path.display(),
                    "discarding unreadable settings: {e:#}"
                );
                self.reset_to_defaults()
            }
        }
    }

    fn reset_to_defaults(&self) -> Config {
        let config = Config::default();
        if let Err(e) = self.save(&config) {
            warn!("could not write default settings: {e:#}");
        }
        config
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
