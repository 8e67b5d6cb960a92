//! OpenAI-compatible chat-completions client.

use super::{ChatRequest, ChatResponse, LlmClient};
use crate::config::LlmConfig;
use crate::errors::LlmError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Calls `POST {base_url}/chat/completions` with bearer auth.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Creates a client, resolving the API key from the configuration.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.resolve_api_key()?;
        Self::new_with_key(config, api_key)
    }

    /// Creates a client with an explicit API key.
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::ApiRequest {
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// The completions endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn map_http_error(status: StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 => {
                debug!(body = %body, "Authentication failed (401)");
                LlmError::AuthFailed {
                    provider: "OpenAI-compatible".to_string(),
                }
            }
            429 => LlmError::RateLimited {
                retry_after_secs: retry_after(body).unwrap_or(5),
            },
            code if code >= 500 => LlmError::ApiRequest {
                message: format!("Server error ({status}): {body}"),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {status}: {body}"),
            },
        }
    }
}

/// Extracts N from rate-limit messages like "... try again in 20s".
fn retry_after(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?;
    let tail = message.rsplit("in ").next()?;
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = self.endpoint();
        debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest {
                message: format!("Request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::ApiRequest {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| LlmError::ResponseParse {
            message: format!("Invalid JSON: {e}"),
        })
    }
}
