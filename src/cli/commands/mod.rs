//! Subcommand implementations.

/// Chat mode command handler.
pub mod chat;

/// Settings display command handler.
pub mod config;

/// Service listing command handler.
pub mod services;
