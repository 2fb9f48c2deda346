//! Chat-completion client abstraction.
//!
//! Conversions need exactly one capability from a model provider: submit a prompt, get text
//! back. [`ModelClient`] captures that, [`AnthropicClient`] implements it against the Messages
//! API, and [`StaticModelClient`] answers with canned text so the rest of the pipeline can be
//! exercised offline.

mod anthropic;

pub use anthropic::{ANTHROPIC_VERSION, AnthropicClient};

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by model providers. Provider messages are passed through verbatim.
#[derive(Debug, Error)]
pub enum ModelClientError {
    /// No API key was configured.
    #[error(
        "Anthropic API key required. Set the ANTHROPIC_API_KEY environment variable or pass --api-key."
    )]
    MissingApiKey,
    /// Provider could not be reached.
    #[error("Model provider unavailable: {0}")]
    Unavailable(String),
    /// Provider rejected the credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),
    /// Provider throttled the request.
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// Provider returned another error response.
    #[error("Model API returned {status}: {message}")]
    Api {
        /// HTTP status of the failing response.
        status: StatusCode,
        /// Provider error message.
        message: String,
    },
    /// Provider response could not be interpreted.
    #[error("Malformed model response: {0}")]
    InvalidResponse(String),
}

/// Single-turn request passed to a model provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Optional system prompt.
    pub system: Option<String>,
    /// Fully composed user prompt.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Submit the prompt and return the text of the first response segment.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelClientError>;
}

/// Provider that answers every request with the same text and records what it was asked.
#[derive(Debug, Clone, Default)]
pub struct StaticModelClient {
    response: String,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl StaticModelClient {
    /// Create a client that always answers with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            requests: Arc::default(),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for StaticModelClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelClientError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_client_records_requests() {
        let client = StaticModelClient::new("ex:Shape a sh:NodeShape .");
        let clone = client.clone();

        let text = client
            .complete(CompletionRequest {
                model: "test-model".into(),
                system: None,
                prompt: "Convert".into(),
                max_tokens: 16,
            })
            .await
            .expect("completion");

        assert_eq!(text, "ex:Shape a sh:NodeShape .");
        let requests = clone.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "Convert");
    }
}
