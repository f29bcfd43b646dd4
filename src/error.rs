//! Error taxonomy surfaced to the host.
//!
//! Every failure that reaches the user is one of the [`ChatError`] variants.
//! The `debug` setting only changes how much of the error is shown, see
//! [`ChatError::user_message`].

use thiserror::Error;

use crate::config::Service;

/// Coarse classification of a [`ChatError`], cheap to copy into turn state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    CommandArgument,
    CommandNotFound,
    Transport,
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The adapter for `service` cannot be built until `missing` are set.
    #[error("Configuration incomplete for {service}: missing {}", missing.join(", "))]
    Configuration {
        service: Service,
        missing: Vec<&'static str>,
    },

    /// A command was selected but its argument is absent or malformed.
    #[error("{message}")]
    CommandArgument { command: String, message: String },

    /// The selected command does not match the current input.
    #[error("Command '{0}' not found")]
    CommandNotFound(String),

    /// Network, TLS, timeout or HTTP status failure talking to a backend.
    #[error("Request to {service} at '{endpoint}' (model '{model}') failed: {detail}")]
    Transport {
        service: Service,
        endpoint: String,
        model: String,
        detail: String,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ChatError {
    pub fn missing_argument(command: &str, hint: &str) -> Self {
        Self::CommandArgument {
            command: command.to_string(),
            message: format!("Expected argument '{hint}' for command '/{command}'"),
        }
    }

    pub fn invalid_argument(command: &str, message: impl Into<String>) -> Self {
        Self::CommandArgument {
            command: command.to_string(),
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::CommandArgument { .. } => ErrorKind::CommandArgument,
            Self::CommandNotFound(_) => ErrorKind::CommandNotFound,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Text shown to the user.
    ///
    /// With `debug` off, transport and unexpected errors are reduced to a
    /// generic hint; with it on, the full diagnostic is included.
    pub fn user_message(&self, debug: bool) -> String {
        match self {
            Self::Configuration { service, missing } => format!(
                "Configuration incomplete for {service}. The missing configurations are: {}",
                missing.join(", ")
            ),
            Self::CommandArgument { message, .. } => message.clone(),
            Self::CommandNotFound(_) => self.to_string(),
            Self::Transport {
                service,
                endpoint,
                model,
                detail,
            } => {
                let hint = format!(
                    "Error calling API over HTTP, is there a '{service}' server running and \
                     accepting connections at '{endpoint}' with model '{model}'? \
                     Or perhaps the API key is incorrect?"
                );
                if debug {
                    format!("{hint}\n\n{detail}")
                } else {
                    hint
                }
            }
            Self::Unexpected(detail) => {
                if debug {
                    detail.clone()
                } else {
                    "An unexpected error occurred".to_string()
                }
            }
        }
    }
}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        Self::Unexpected(format!("{err:#}"))
    }
}
