use crate::ai::TextGenerator;
use crate::error::AiError;
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ClaudeClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_elapsed: Duration,
}

#[derive(Debug, Serialize)]
pub struct ClaudeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    pub content: Vec<ResponseContent>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ResponseContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl ClaudeClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, "https://api.anthropic.com/v1")
    }

    pub fn with_base_url(api_key: String, model: String, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_elapsed: Duration::from_secs(120),
        }
    }

    /// Cap on total time spent retrying one request
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    pub async fn create_message(&self, messages: Vec<ClaudeMessage>) -> Result<ClaudeResponse, AiError> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            messages,
            temperature: Some(0.7),
        };

        let backoff_config = ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            max_elapsed_time: Some(self.max_elapsed),
            ..Default::default()
        };

        // Retry on rate limits, 5xx and connection problems
        let operation = || async {
            let response = self
                .client
                .post(format!("{}/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .timeout(Duration::from_secs(120))
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_connect() || e.is_timeout() {
                        tracing::warn!("Claude API connection error (retrying): {}", e);
                        backoff::Error::transient(AiError::Request(e.to_string()))
                    } else {
                        backoff::Error::permanent(AiError::Request(e.to_string()))
                    }
                })?;

            let status = response.status();
            let response_text = response
                .text()
                .await
                .map_err(|e| backoff::Error::permanent(AiError::Request(e.to_string())))?;

            let error = AiError::Api {
                status: status.as_u16(),
                body: response_text.clone(),
            };
            if matches!(status.as_u16(), 429 | 500 | 502 | 503 | 529) {
                tracing::warn!("Claude API returned {} (retrying)", status);
                return Err(backoff::Error::transient(error));
            }
            if !status.is_success() {
                tracing::error!("Claude API permanent error ({}): {}", status, response_text);
                return Err(backoff::Error::permanent(error));
            }

            serde_json::from_str::<ClaudeResponse>(&response_text).map_err(|e| {
                backoff::Error::permanent(AiError::Request(format!("Failed to parse response: {}", e)))
            })
        };

        retry(backoff_config, operation).await
    }
}

#[async_trait]
impl TextGenerator for ClaudeClient {
    fn name(&self) -> &str {
        "Claude"
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, AiError> {
        let response = self
            .create_message(vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }])
            .await?;

        response
            .content
            .into_iter()
            .find_map(|block| match block {
                ResponseContent::Text { text } if !text.trim().is_empty() => Some(text),
                _ => None,
            })
            .ok_or(AiError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_generate_text_returns_first_text_block() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"[\"@mkbhd\"]"}],"stop_reason":"end_turn"}"#)
            .create_async()
            .await;

        let client = ClaudeClient::with_base_url("key".into(), "claude-test".into(), &server.url());
        let text = client.generate_text("suggest").await.unwrap();
        assert_eq!(text, "[\"@mkbhd\"]");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .with_status(400)
            .with_body(r#"{"error":"bad request"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ClaudeClient::with_base_url("key".into(), "claude-test".into(), &server.url());
        let err = client.generate_text("x").await.unwrap_err();
        assert!(matches!(err, AiError::Api { status: 400, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_overloaded_is_retried_until_deadline() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .with_status(529)
            .expect_at_least(2)
            .create_async()
            .await;

        let client = ClaudeClient::with_base_url("key".into(), "claude-test".into(), &server.url())
            .with_max_elapsed(Duration::from_secs(2));
        let err = client.generate_text("x").await.unwrap_err();
        assert!(matches!(err, AiError::Api { status: 529, .. }));
        mock.assert_async().await;
    }
}
