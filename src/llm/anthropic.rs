use super::{CompletionRequest, ModelClient, ModelClientError};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Value sent in the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API client.
pub struct AnthropicClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AnthropicClient {
    /// Build a client, failing before any I/O when no usable key is supplied.
    pub fn new(api_key: Option<&str>, base_url: &str) -> Result<Self, ModelClientError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ModelClientError::MissingApiKey)?
            .to_string();
        let http = Client::builder()
            .user_agent(concat!("shacl-transformer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ModelClientError::Unavailable(error.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ModelClientError> {
        Self::new(config.anthropic_api_key.as_deref(), &config.anthropic_base_url)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn provider_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelClientError> {
        let mut payload = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
        });
        if let Some(system) = request.system.as_deref().filter(|system| !system.is_empty()) {
            payload["system"] = json!(system);
        }

        tracing::debug!(
            model = %request.model,
            max_tokens = request.max_tokens,
            prompt_chars = request.prompt.len(),
            "Submitting prompt"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ModelClientError::Unavailable(format!(
                    "failed to reach {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = provider_message(&body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ModelClientError::Authentication(message)
                }
                StatusCode::TOO_MANY_REQUESTS => ModelClientError::RateLimited(message),
                _ => ModelClientError::Api { status, message },
            });
        }

        let body: MessagesResponse = response.json().await.map_err(|error| {
            ModelClientError::InvalidResponse(format!("failed to decode Messages response: {error}"))
        })?;

        if body.stop_reason.as_deref() == Some("max_tokens") {
            tracing::warn!(
                max_tokens = request.max_tokens,
                "Model stopped at the token limit; output is likely truncated"
            );
        }

        body.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| {
                ModelClientError::InvalidResponse("response contained no text content".into())
            })
    }
}
