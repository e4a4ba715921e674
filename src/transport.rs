use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::error::{Result, TravelAssistantError};
use crate::models::{ChatRequest, ChatResponse};
use crate::retry::RetryPolicy;

#[cfg(test)]
use mockall::automock;

const MAX_RETRY_DURATION: Duration = Duration::from_secs(120);

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse>;
}

/// OpenAI-compatible chat completions client (Gemini, or anything speaking the same API)
pub struct LlmTransport {
    client: Client,
    api_key: String,
    endpoint: String,
    retry: RetryPolicy,
}

impl LlmTransport {
    pub fn new(client: Client, api_key: String, base_url: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            retry,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_once(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(|e| {
                TravelAssistantError::Internal(format!("Failed to parse LLM API response: {e}"))
            });
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(TravelAssistantError::Upstream {
            service: "LLM".to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Transport for LlmTransport {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let start_time = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;
            tracing::debug!(
                model = %req.model,
                messages = req.messages.len(),
                tools = req.tools.len(),
                attempt = attempts,
                "Sending chat completion request"
            );

            let err = match self.send_once(req).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !err.is_retryable() || attempts >= self.retry.max_attempts {
                tracing::warn!("LLM request failed after {} attempt(s): {}", attempts, err);
                return Err(err);
            }

            if start_time.elapsed() > MAX_RETRY_DURATION {
                return Err(TravelAssistantError::Timeout(format!(
                    "LLM request gave up after {} seconds (max retry duration exceeded): {err}",
                    MAX_RETRY_DURATION.as_secs()
                )));
            }

            let delay = self.retry.delay_for(attempts);
            tracing::warn!(
                "LLM request attempt {} failed ({}), retrying in {:?}",
                attempts,
                err,
                delay
            );
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;

    #[test]
    fn test_endpoint_joins_base_url() {
        let transport = LlmTransport::new(
            Client::new(),
            "key".to_string(),
            "https://generativelanguage.googleapis.com/v1beta/openai/",
            RetryPolicy::none(),
        );
        assert_eq!(
            transport.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 on localhost is closed; the connection is refused without retries
        let transport = LlmTransport::new(
            Client::builder()
                .timeout(Duration::from_secs(2))
                .no_proxy()
                .build()
                .expect("client should build"),
            "key".to_string(),
            "http://127.0.0.1:9",
            RetryPolicy::none(),
        );
        let req = ChatRequest {
            model: "gemini-2.5-flash".to_string(),
            messages: vec![ChatMessage::user("What is the capital of France?")],
            temperature: 0.0,
            max_tokens: 16,
            tools: vec![],
        };
        let err = transport.chat(&req).await.expect_err("request must fail");
        assert!(matches!(
            err,
            TravelAssistantError::Network(_) | TravelAssistantError::Timeout(_)
        ));
    }
}
