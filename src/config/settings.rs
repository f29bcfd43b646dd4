use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default system prompt sent ahead of every conversation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI assistant, you should provide help to the \
user with their query. Act as if you are human with emotions, use fun and relaxing tone when \
appropriate. However, remember you are still an AI model. Respond in Markdown format if necessary.";

/// Default number of conversation messages sent as context.
pub const DEFAULT_HISTORY: u32 = 6;

/// Chat backends that can be selected with `/service`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Service {
    #[default]
    Ollama,
    OpenAI,
    AzureOpenAI,
    Google,
    Mistral,
}

impl Service {
    pub const ALL: [Self; 5] = [
        Self::Ollama,
        Self::OpenAI,
        Self::AzureOpenAI,
        Self::Google,
        Self::Mistral,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::AzureOpenAI => "AzureOpenAI",
            Self::Google => "Google",
            Self::Mistral => "Mistral",
        }
    }

    pub const fn requires_url(self) -> bool {
        matches!(self, Self::Ollama | Self::AzureOpenAI)
    }

    pub const fn requires_api_key(self) -> bool {
        matches!(self, Self::AzureOpenAI | Self::Google | Self::Mistral)
    }

    /// Base URL used when `url` is left empty, if the service has one.
    pub const fn default_url(self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("https://api.openai.com/v1"),
            Self::Google => Some("https://generativelanguage.googleapis.com"),
            Self::Mistral => Some("https://api.mistral.ai/v1"),
            Self::Ollama | Self::AzureOpenAI => None,
        }
    }

    /// Comma separated list of every service name, quoted.
    pub fn choices() -> String {
        Self::ALL
            .iter()
            .map(|s| format!("'{}'", s.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|service| service.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid service '{s}', expected one of {}", Self::choices()))
    }
}

/// User settings, persisted as JSON.
///
/// A `Config` value is treated as an immutable snapshot: commands build a new
/// one rather than editing the current one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub service: Service,
    pub url: String,
    pub model: Option<String>,
    /// Show the full response in the detail pane.
    pub details: bool,
    pub api_key: Option<String>,
    pub system: String,
    /// Maximum number of conversation messages sent as context.
    pub history: u32,
    /// Surface full diagnostics instead of generic error messages.
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: Service::default(),
            url: String::new(),
            model: None,
            details: true,
            api_key: None,
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            history: DEFAULT_HISTORY,
            debug: false,
        }
    }
}

impl Config {
    /// Fields the current service needs that are unset, in `model, url, apikey` order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if is_blank(self.model.as_deref()) {
            missing.push("model");
        }
        if self.service.requires_url() && self.url.trim().is_empty() {
            missing.push("url");
        }
        if self.service.requires_api_key() && is_blank(self.api_key.as_deref()) {
            missing.push("apikey");
        }

        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// The model name, or an empty string when unset.
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or_default()
    }

    /// The configured URL, falling back to the service default.
    pub fn base_url(&self) -> &str {
        let url = self.url.trim();
        if url.is_empty() {
            self.service.default_url().unwrap_or_default()
        } else {
            url
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.history > 0
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
