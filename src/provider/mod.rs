//! Chat backends.
//!
//! An [`Adapter`] is built from one settings snapshot and never changes; a
//! settings change builds a new one. The session only sees the
//! [`ChatProvider`] trait so tests can script replies.

mod google;
mod http;
mod ollama;
mod openai;
mod stream;

use futures_util::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{Config, Service};
use crate::conversation::ChatMessage;
use crate::error::ChatError;

pub use google::GeminiClient;
pub use http::Target;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use stream::{LineBuffer, LineEvent, LineParser};

/// Lazy, finite sequence of non-empty text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

pub trait ChatProvider: Send + Sync {
    fn service(&self) -> Service;

    /// Starts a streamed reply to `history`.
    ///
    /// No request is made until the stream is polled. The stream stops at the
    /// next fragment boundary once `cancel` fires.
    fn chat_stream(&self, history: Vec<ChatMessage>, cancel: CancellationToken) -> FragmentStream;
}

/// One client per service.
pub enum Adapter {
    Ollama(OllamaClient),
    OpenAi(OpenAiClient),
    AzureOpenAi(OpenAiClient),
    Google(GeminiClient),
    Mistral(OpenAiClient),
}

impl Adapter {
    /// Builds the client for `config.service`.
    ///
    /// Fails with [`ChatError::Configuration`] while a field the service needs
    /// is unset.
    pub fn create(config: &Config) -> Result<Self, ChatError> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(ChatError::Configuration {
                service: config.service,
                missing,
            });
        }

        let adapter = match config.service {
            Service::Ollama => Self::Ollama(OllamaClient::new(config)?),
            Service::OpenAI => Self::OpenAi(OpenAiClient::new(config)?),
            Service::AzureOpenAI => Self::AzureOpenAi(OpenAiClient::new(config)?),
            Service::Google => Self::Google(GeminiClient::new(config)?),
            Service::Mistral => Self::Mistral(OpenAiClient::new(config)?),
        };

        debug!(
            service = %config.service,
            endpoint = %adapter.target().endpoint,
            model = %adapter.target().model,
            "adapter created"
        );
        Ok(adapter)
    }

    pub const fn target(&self) -> &Target {
        match self {
            Self::Ollama(client) => client.target(),
            Self::OpenAi(client) | Self::AzureOpenAi(client) | Self::Mistral(client) => {
                client.target()
            }
            Self::Google(client) => client.target(),
        }
    }
}

impl ChatProvider for Adapter {
    fn service(&self) -> Service {
        self.target().service
    }

    fn chat_stream(&self, history: Vec<ChatMessage>, cancel: CancellationToken) -> FragmentStream {
        match self {
            Self::Ollama(client) => client.chat_stream(history, cancel),
            Self::OpenAi(client) | Self::AzureOpenAi(client) | Self::Mistral(client) => {
                client.chat_stream(history, cancel)
            }
            Self::Google(client) => client.chat_stream(history, cancel),
        }
    }
}
