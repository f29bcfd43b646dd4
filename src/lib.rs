//! # chatline - Multi-backend LLM chat from the terminal
//!
//! `chatline` holds a streaming conversation with one of several LLM
//! services (Ollama, OpenAI, Azure OpenAI, Google Gemini, Mistral). The same
//! input line carries both chat text and `/` commands that change settings.
//!
//! ## Quick Start
//!
//! ```bash
//! # Start chatting (the default)
//! chatline
//!
//! # Inside the session
//! /service Ollama
//! /url http://localhost:11434
//! /model llama3.2
//! Why is the sky blue?
//!
//! # Inspect saved settings
//! chatline config
//! chatline services
//! ```
//!
//! ## Configuration
//!
//! Settings live in `~/.config/chatline/config.json` and are written back
//! every time a command changes them:
//!
//! ```json
//! {
//!   "service": "Ollama",
//!   "url": "http://localhost:11434",
//!   "model": "llama3.2",
//!   "details": true,
//!   "apiKey": null,
//!   "system": "You are a helpful assistant.",
//!   "history": 6,
//!   "debug": false
//! }
//! ```

/// Interactive chat session and terminal front end.
pub mod chat;

/// Command-line interface definitions and handlers.
pub mod cli;

/// Slash command registry, built-in commands and fuzzy ranking.
pub mod command;

/// Settings model and JSON persistence.
pub mod config;

/// Turn list and request context windowing.
pub mod conversation;

/// Error kinds shared across the crate.
pub mod error;

/// File system utilities.
pub mod fs;

/// Diagnostic logging setup.
pub mod logging;

/// XDG-style path utilities for configuration.
pub mod paths;

/// Streaming adapters for each LLM service.
pub mod provider;

/// Terminal UI components (spinner, colors).
pub mod ui;
