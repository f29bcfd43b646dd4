//! Diagnostic logging to stderr.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
pub const LOG_ENV: &str = "CHATLINE_LOG";

/// Filter used when neither `--verbose` nor [`LOG_ENV`] say otherwise.
const DEFAULT_DIRECTIVE: &str = "warn";

const VERBOSE_DIRECTIVE: &str = "chatline=debug";

/// Picks the filter directive. `--verbose` wins over the environment.
pub fn directive(verbose: bool, env: Option<&str>) -> String {
    if verbose {
        return VERBOSE_DIRECTIVE.to_string();
    }
    env.map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVE)
        .to_string()
}

/// Installs the global subscriber. Calling it again is a no-op.
pub fn init(verbose: bool) {
    let env = std::env::var(LOG_ENV).ok();
    let filter = EnvFilter::try_new(directive(verbose, env.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
