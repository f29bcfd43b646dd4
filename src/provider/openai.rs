//! OpenAI-compatible chat completions, shared by OpenAI, Azure OpenAI and Mistral.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::http::{self, Target};
use super::stream::{self, LineEvent};
use super::{ChatProvider, FragmentStream};
use crate::config::{Config, Service};
use crate::conversation::ChatMessage;
use crate::error::ChatError;

const AZURE_API_VERSION: &str = "2024-10-21";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Auth {
    /// `Authorization: Bearer`, omitted when no key is configured.
    Bearer,
    /// Azure's `api-key` header.
    ApiKey,
}

/// Client for any endpoint speaking the chat completions protocol.
pub struct OpenAiClient {
    client: Client,
    target: Target,
    auth: Auth,
    api_key: Option<String>,
    /// Azure selects the model by deployment URL, not in the body.
    send_model: bool,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        let base = config.base_url();
        let model = config.model_name();

        let (endpoint, auth, send_model) = match config.service {
            Service::AzureOpenAI => (
                http::join(
                    base,
                    &format!(
                        "openai/deployments/{model}/chat/completions?api-version={AZURE_API_VERSION}"
                    ),
                ),
                Auth::ApiKey,
                false,
            ),
            _ => (http::join(base, "chat/completions"), Auth::Bearer, true),
        };

        Ok(Self {
            client: http::build_client()?,
            target: Target {
                service: config.service,
                endpoint,
                model: model.to_string(),
            },
            auth,
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string),
            send_model,
        })
    }

    pub const fn target(&self) -> &Target {
        &self.target
    }

    fn body<'a>(&'a self, history: &'a [ChatMessage]) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: self.send_model.then_some(self.target.model.as_str()),
            messages: history
                .iter()
                .map(|m| Message {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        }
    }
}

impl ChatProvider for OpenAiClient {
    fn service(&self) -> Service {
        self.target.service
    }

    fn chat_stream(&self, history: Vec<ChatMessage>, cancel: CancellationToken) -> FragmentStream {
        let mut request = self
            .client
            .post(&self.target.endpoint)
            .json(&self.body(&history));

        if let Some(key) = &self.api_key {
            request = match self.auth {
                Auth::Bearer => request.bearer_auth(key),
                Auth::ApiKey => request.header("api-key", key),
            };
        }

        stream::fragment_stream(self.target.clone(), request, cancel, parse_sse_line)
    }
}

/// Parses one SSE line of a chat completions stream.
pub fn parse_sse_line(line: &str) -> Result<LineEvent, String> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(LineEvent::Skip);
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(LineEvent::Done);
    }

    let response: StreamResponse = serde_json::from_str(data).map_err(|e| e.to_string())?;

    let content: String = response
        .choices
        .into_iter()
        .filter_map(|c| c.delta.content)
        .collect();

    Ok(if content.is_empty() {
        LineEvent::Skip
    } else {
        LineEvent::Text(content)
    })
}
