/// LLM Client: the single point of entry for all chat-completion calls.
///
/// No other module may call the provider directly. The credential is supplied
/// per call because keys belong to the caller, not to the server.
///
/// Model: Qwen3-Next-80B, hardcoded because the prompts are tuned for it.
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

/// The model used for all LLM calls.
pub const MODEL: &str = "Qwen/Qwen3-Next-80B-A3B-Instruct";
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Blank or absent credential. Reported before any network traffic.
    #[error("Enter your API key")]
    MissingCredential,

    #[error("Provider rejected the credential (status {status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("LLM call timed out after {0}s")]
    Timeout(u64),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed provider response: {0}")]
    Parse(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Coarse failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingCredential,
    Auth,
    RateLimit,
    Network,
    UnknownProvider,
}

impl LlmError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LlmError::MissingCredential => FailureKind::MissingCredential,
            LlmError::Auth { .. } => FailureKind::Auth,
            LlmError::RateLimited { .. } => FailureKind::RateLimit,
            LlmError::Network(_) | LlmError::Timeout(_) => FailureKind::Network,
            LlmError::Api { .. } | LlmError::Parse(_) | LlmError::EmptyContent => {
                FailureKind::UnknownProvider
            }
        }
    }
}

/// A system + user message pair ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatCompletionResponse {
    /// Returns the content of the first choice, if it carries any text.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Retry schedule for transient failures (transport errors, 429, 5xx).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// The single LLM client used by the analysis pipeline.
/// Wraps an OpenAI-compatible `/chat/completions` endpoint with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            retry: RetryPolicy::default(),
        })
    }

    #[cfg(test)]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sends the prompt and returns the generated text.
    /// Retries on connection errors, 429 and 5xx with exponential backoff.
    /// A timeout ends the call.
    pub async fn complete(
        &self,
        credential: &str,
        prompt: &ChatPrompt,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(LlmError::MissingCredential);
        }

        let url = format!("{}/chat/completions", self.base_url);
        let request_body = ChatCompletionRequest {
            model: MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens,
        };

        let attempts = self.retry.max_attempts.max(1);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.base_delay * (1u32 << (attempt - 1));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(credential)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                // The client timeout bounds the whole call, so a timed-out attempt is final.
                Err(e) if e.is_timeout() => {
                    warn!("LLM call timed out after {}s", self.timeout.as_secs());
                    return Err(LlmError::Timeout(self.timeout.as_secs()));
                }
                Err(e) => {
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::RateLimited {
                    attempts: attempt + 1,
                });
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: provider_message(&body),
                });
                continue;
            }

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Auth {
                    status: status.as_u16(),
                    message: provider_message(&body),
                });
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: provider_message(&body),
                });
            }

            let completion: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| LlmError::Parse(e.to_string()))?;

            if let Some(usage) = &completion.usage {
                debug!(
                    "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                    usage.prompt_tokens, usage.completion_tokens
                );
            }

            return completion
                .text()
                .map(str::to_string)
                .ok_or(LlmError::EmptyContent);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited { attempts }))
    }
}

/// Pulls a readable message out of an error body. Providers disagree on the
/// shape: OpenAI nests it under `error.message`, SiliconFlow uses `message`.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn prompt() -> ChatPrompt {
        ChatPrompt {
            system: "You evaluate resumes".to_string(),
            user: "Evaluate: John Doe".to_string(),
        }
    }

    fn client(base_url: &str) -> LlmClient {
        LlmClient::new(base_url, Duration::from_secs(5))
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::ZERO,
            })
    }

    fn completion_body(content: &str) -> String {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 40}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": MODEL,
                "max_tokens": 1500,
                "messages": [
                    {"role": "system", "content": "You evaluate resumes"},
                    {"role": "user", "content": "Evaluate: John Doe"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body("Score: 72/100"))
            .create_async()
            .await;

        let text = client(&server.url())
            .complete("sk-test", &prompt(), 1500)
            .await
            .unwrap();

        assert_eq!(text, "Score: 72/100");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_credential_short_circuits_without_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let err = client(&server.url())
            .complete("   ", &prompt(), 1500)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::MissingCredential));
        assert_eq!(err.to_string(), "Enter your API key");
        assert_eq!(err.kind(), FailureKind::MissingCredential);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_auth_error_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Invalid API key"}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server.url())
            .complete("sk-bad", &prompt(), 1500)
            .await
            .unwrap_err();

        match &err {
            LlmError::Auth { status, message } => {
                assert_eq!(*status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("expected Auth, got {other:?}"),
        }
        assert_eq!(err.kind(), FailureKind::Auth);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_reported() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"message": "quota exceeded"}"#)
            .expect(3)
            .create_async()
            .await;

        let err = client(&server.url())
            .complete("sk-test", &prompt(), 1500)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::RateLimited { attempts: 3 }));
        assert_eq!(err.kind(), FailureKind::RateLimit);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_retried_then_unknown_provider() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("upstream unavailable")
            .expect(3)
            .create_async()
            .await;

        let err = client(&server.url())
            .complete("sk-test", &prompt(), 1500)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 503, .. }));
        assert_eq!(err.kind(), FailureKind::UnknownProvider);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_choices_is_empty_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .complete("sk-test", &prompt(), 1500)
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_timeout_is_not_retried() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                held.push(socket);
            }
        });

        let llm = LlmClient::new(format!("http://{addr}"), Duration::from_millis(200))
            .unwrap()
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_secs(5),
            });

        let started = std::time::Instant::now();
        let err = llm.complete("sk-valid", &prompt(), 100).await.unwrap_err();

        assert!(matches!(err, LlmError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_provider_message_shapes() {
        assert_eq!(
            provider_message(r#"{"error": {"message": "bad key"}}"#),
            "bad key"
        );
        assert_eq!(provider_message(r#"{"code": 20015, "message": "quota"}"#), "quota");
        assert_eq!(provider_message("plain body"), "plain body");
    }
}
