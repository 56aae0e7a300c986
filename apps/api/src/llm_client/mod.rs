/// LLM Client — the single point of entry for all judgment-service calls in the screener.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Screening code depends on the `JudgmentService` trait, never on this client.
///
/// Configuration is explicit (`LlmConfig`); there is no process-wide client.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Everything the client needs to reach the judgment service.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    /// Kept low so repeated screenings of the same resume agree.
    pub temperature: f32,
    /// Total attempts per call, including the first.
    pub max_retries: u32,
    /// First backoff delay; doubles on each further retry.
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            temperature: 0.3,
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Failure to obtain any response text from the judgment service.
/// Callers may retry these with backoff.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("could not decode API envelope: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn timeout(after: Duration) -> Self {
        TransportError::Timeout {
            after_ms: after.as_millis() as u64,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout { after_ms: 0 }
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

/// The judgment service contract: send a prompt, get the raw response text back.
///
/// Implementations must not hold state between calls, so an identical
/// request can be resent after a transport failure.
#[async_trait]
pub trait JudgmentService: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, TransportError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Anthropic Messages API client with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Makes a raw call to the API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, TransportError> {
        let request_body = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let max_attempts = self.config.max_retries.max(1);
        let mut last_error: Option<TransportError> = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                // Exponential backoff: base, 2×base, 4×base, ...
                let delay = self.config.retry_backoff * (1 << (attempt - 1));
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "LLM call failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.config.api_url)
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    let err = TransportError::from(e);
                    if err.is_timeout() {
                        return Err(TransportError::timeout(self.config.request_timeout));
                    }
                    last_error = Some(err);
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), %body, "LLM API returned retryable status");
                last_error = Some(if status.as_u16() == 429 {
                    TransportError::RateLimited {
                        retries: attempt + 1,
                    }
                } else {
                    TransportError::Api {
                        status: status.as_u16(),
                        message: body,
                    }
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(TransportError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                input_tokens = llm_response.usage.input_tokens,
                output_tokens = llm_response.usage.output_tokens,
                "LLM call succeeded"
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(TransportError::RateLimited {
            retries: max_attempts,
        }))
    }
}

#[async_trait]
impl JudgmentService for LlmClient {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, TransportError> {
        let response = self.call(prompt, system).await?;
        response
            .text()
            .filter(|text| !text.trim().is_empty())
            .map(String::from)
            .ok_or(TransportError::EmptyContent)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
/// Nothing else is repaired.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_leaves_prose_alone() {
        let input = "Here you go: {\"key\": 1}";
        assert_eq!(strip_json_fences(input), input);
    }

    /// Serves a scripted sequence of (status, body) pairs on a local port.
    async fn spawn_fake_api(script: Vec<(u16, Value)>) -> (String, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = (Arc::new(script), calls.clone());

        async fn handler(
            State((script, calls)): State<(Arc<Vec<(u16, Value)>>, Arc<AtomicUsize>)>,
            Json(_body): Json<Value>,
        ) -> (StatusCode, Json<Value>) {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let (status, body) = script[n.min(script.len() - 1)].clone();
            (StatusCode::from_u16(status).unwrap(), Json(body))
        }

        let app = Router::new()
            .route("/v1/messages", post(handler))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1/messages"), calls)
    }

    fn test_client(api_url: String) -> LlmClient {
        let mut config = LlmConfig::new("test-key".to_string());
        config.api_url = api_url;
        config.retry_backoff = Duration::from_millis(1);
        LlmClient::new(config).unwrap()
    }

    fn ok_body(text: &str) -> Value {
        json!({
            "content": [{"type": "text", "text": text}],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    #[tokio::test]
    async fn test_complete_returns_first_text_block() {
        let (url, calls) = spawn_fake_api(vec![(200, ok_body("{\"ok\": true}"))]).await;
        let text = test_client(url).complete("prompt", "system").await.unwrap();
        assert_eq!(text, "{\"ok\": true}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_rate_limit_then_succeeds() {
        let (url, calls) = spawn_fake_api(vec![
            (429, json!({"error": {"message": "slow down"}})),
            (503, json!({"error": {"message": "overloaded"}})),
            (200, ok_body("done")),
        ])
        .await;
        let text = test_client(url).complete("prompt", "system").await.unwrap();
        assert_eq!(text, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (url, calls) =
            spawn_fake_api(vec![(400, json!({"error": {"message": "bad model"}}))]).await;
        let err = test_client(url).complete("prompt", "system").await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Api {
                status: 400,
                message: "bad model".to_string()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (url, calls) =
            spawn_fake_api(vec![(429, json!({"error": {"message": "slow down"}}))]).await;
        let err = test_client(url).complete("prompt", "system").await.unwrap_err();
        assert_eq!(err, TransportError::RateLimited { retries: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_blank_text_is_empty_content() {
        let (url, _) = spawn_fake_api(vec![(200, ok_body("   "))]).await;
        let err = test_client(url).complete("prompt", "system").await.unwrap_err();
        assert_eq!(err, TransportError::EmptyContent);
    }
}
