//! HTTP plumbing shared by every adapter.

use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

use crate::config::Service;
use crate::error::ChatError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a request is going, kept for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub service: Service,
    pub endpoint: String,
    pub model: String,
}

impl Target {
    pub fn transport_error(&self, detail: impl Into<String>) -> ChatError {
        ChatError::Transport {
            service: self.service,
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            detail: detail.into(),
        }
    }

    /// Maps a reqwest failure onto the error taxonomy.
    ///
    /// Anything that went wrong getting bytes over the wire is a transport
    /// error; the rest (building the request, redirect loops) is unexpected.
    pub fn classify(&self, err: &reqwest::Error) -> ChatError {
        if err.is_connect()
            || err.is_timeout()
            || err.is_request()
            || err.is_body()
            || err.is_status()
        {
            self.transport_error(err.to_string())
        } else {
            ChatError::Unexpected(err.to_string())
        }
    }
}

pub fn build_client() -> Result<Client, ChatError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ChatError::Unexpected(format!("Failed to build HTTP client: {e}")))
}

/// Sends the request and turns a non-success status into a transport error.
pub async fn send(target: &Target, request: RequestBuilder) -> Result<Response, ChatError> {
    let response = request.send().await.map_err(|e| target.classify(&e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(target.transport_error(format!("HTTP {status}: {}", body.trim())));
    }

    Ok(response)
}

/// Joins a base URL and a path without doubling or dropping the slash.
pub fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
