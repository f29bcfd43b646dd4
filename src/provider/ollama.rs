//! Ollama's native `/api/chat` endpoint, which streams NDJSON.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::http::{self, Target};
use super::stream::{self, LineEvent};
use super::{ChatProvider, FragmentStream};
use crate::config::{Config, Service};
use crate::conversation::ChatMessage;
use crate::error::ChatError;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

pub struct OllamaClient {
    client: Client,
    target: Target,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        Ok(Self {
            client: http::build_client()?,
            target: Target {
                service: Service::Ollama,
                endpoint: http::join(config.base_url(), "api/chat"),
                model: config.model_name().to_string(),
            },
        })
    }

    pub const fn target(&self) -> &Target {
        &self.target
    }
}

impl ChatProvider for OllamaClient {
    fn service(&self) -> Service {
        Service::Ollama
    }

    fn chat_stream(&self, history: Vec<ChatMessage>, cancel: CancellationToken) -> FragmentStream {
        let body = ChatRequest {
            model: &self.target.model,
            messages: history
                .iter()
                .map(|m| Message {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        };
        let request = self.client.post(&self.target.endpoint).json(&body);

        stream::fragment_stream(self.target.clone(), request, cancel, parse_ndjson_line)
    }
}

/// Parses one NDJSON record of an Ollama chat stream.
///
/// The final record has `done: true` and may still carry content.
pub fn parse_ndjson_line(line: &str) -> Result<LineEvent, String> {
    let chunk: ChatChunk = serde_json::from_str(line).map_err(|e| e.to_string())?;

    if let Some(error) = chunk.error {
        return Err(error);
    }

    let content = chunk.message.map(|m| m.content).unwrap_or_default();
    Ok(match (content.is_empty(), chunk.done) {
        (false, _) => LineEvent::Text(content),
        (true, true) => LineEvent::Done,
        (true, false) => LineEvent::Skip,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let config = Config {
            url: "http://localhost:11434/".to_string(),
            model: Some("llama3".to_string()),
            ..Config::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.target().endpoint, "http://localhost:11434/api/chat");
        assert_eq!(client.target().model, "llama3");
    }

    #[test]
    fn test_parse_content_line() {
        let line = r#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        assert_eq!(
            parse_ndjson_line(line).unwrap(),
            LineEvent::Text("Hel".to_string())
        );
    }

    #[test]
    fn test_parse_final_line() {
        let line = r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"total_duration":1}"#;
        assert_eq!(parse_ndjson_line(line).unwrap(), LineEvent::Done);
    }

    #[test]
    fn test_parse_empty_delta_is_skipped() {
        let line = r#"{"message":{"role":"assistant","content":""},"done":false}"#;
        assert_eq!(parse_ndjson_line(line).unwrap(), LineEvent::Skip);
    }

    #[test]
    fn test_parse_error_record() {
        let line = r#"{"error":"model 'nope' not found"}"#;
        assert_eq!(
            parse_ndjson_line(line).unwrap_err(),
            "model 'nope' not found"
        );
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_ndjson_line("data: {").is_err());
    }
}
