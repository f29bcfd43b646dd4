//! Google Gemini `streamGenerateContent`, read as SSE.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::http::{self, Target};
use super::stream::{self, LineEvent};
use super::{ChatProvider, FragmentStream};
use crate::config::{Config, Service};
use crate::conversation::{ChatMessage, Role};
use crate::error::ChatError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

pub struct GeminiClient {
    client: Client,
    target: Target,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        let model = config.model_name();
        let endpoint = http::join(
            config.base_url(),
            &format!("v1beta/models/{model}:streamGenerateContent?alt=sse"),
        );

        Ok(Self {
            client: http::build_client()?,
            target: Target {
                service: Service::Google,
                endpoint,
                model: model.to_string(),
            },
            api_key: config.api_key.clone().unwrap_or_default(),
        })
    }

    pub const fn target(&self) -> &Target {
        &self.target
    }
}

/// Splits off the system prompt and renames the assistant role to `model`.
fn body(history: &[ChatMessage]) -> GenerateRequest<'_> {
    let mut system_instruction = None;
    let mut contents = Vec::with_capacity(history.len());

    for message in history {
        let parts = vec![Part {
            text: &message.content,
        }];
        match message.role {
            Role::System => {
                system_instruction = Some(Content { role: None, parts });
            }
            Role::User => contents.push(Content {
                role: Some("user"),
                parts,
            }),
            Role::Assistant => contents.push(Content {
                role: Some("model"),
                parts,
            }),
        }
    }

    GenerateRequest {
        system_instruction,
        contents,
    }
}

impl ChatProvider for GeminiClient {
    fn service(&self) -> Service {
        Service::Google
    }

    fn chat_stream(&self, history: Vec<ChatMessage>, cancel: CancellationToken) -> FragmentStream {
        let request = self
            .client
            .post(&self.target.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body(&history));

        stream::fragment_stream(self.target.clone(), request, cancel, parse_sse_line)
    }
}

/// Parses one SSE line of a Gemini stream. The stream has no end marker.
pub fn parse_sse_line(line: &str) -> Result<LineEvent, String> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(LineEvent::Skip);
    };

    let response: GenerateResponse =
        serde_json::from_str(data.trim_start()).map_err(|e| e.to_string())?;

    let text: String = response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect();

    Ok(if text.is_empty() {
        LineEvent::Skip
    } else {
        LineEvent::Text(text)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let config = Config {
            service: Service::Google,
            model: Some("gemini-2.0-flash".to_string()),
            api_key: Some("key".to_string()),
            ..Config::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.target().endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn test_body_maps_roles() {
        let history = vec![
            ChatMessage::new(Role::System, "Be brief."),
            ChatMessage::new(Role::User, "Hi"),
            ChatMessage::new(Role::Assistant, "Hello"),
            ChatMessage::new(Role::User, "Bye"),
        ];
        let json = serde_json::to_value(body(&history)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "systemInstruction": {"parts": [{"text": "Be brief."}]},
                "contents": [
                    {"role": "user", "parts": [{"text": "Hi"}]},
                    {"role": "model", "parts": [{"text": "Hello"}]},
                    {"role": "user", "parts": [{"text": "Bye"}]}
                ]
            })
        );
    }

    #[test]
    fn test_parse_text_line() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}],"role":"model"}}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            LineEvent::Text("Hello".to_string())
        );
    }

    #[test]
    fn test_parse_finish_without_text() {
        let line = r#"data: {"candidates":[{"finishReason":"STOP"}],"usageMetadata":{}}"#;
        assert_eq!(parse_sse_line(line).unwrap(), LineEvent::Skip);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_sse_line("data: [").is_err());
    }
}
