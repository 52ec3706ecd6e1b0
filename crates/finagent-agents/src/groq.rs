//! Groq chat completions client (OpenAI-compatible API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{BackendMessage, MessageRole, ReasoningBackend};
use crate::error::AgentError;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Long-lived, connection-pooled client for one model.
pub struct GroqBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GroqBackend {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| AgentError::Backend(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        })
    }
}

#[async_trait]
impl ReasoningBackend for GroqBackend {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[BackendMessage],
    ) -> Result<String, AgentError> {
        if self.api_key.is_empty() {
            return Err(AgentError::Backend("Groq API key not configured".to_string()));
        }

        let mut chat = Vec::with_capacity(messages.len() + 1);
        chat.push(ChatMessage {
            role: "system",
            content: system_prompt,
        });
        chat.extend(messages.iter().map(|m| ChatMessage {
            role: match m.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            },
            content: &m.content,
        }));

        let request = ChatRequest {
            model: &self.model,
            messages: chat,
            temperature: 0.2,
        };

        debug!(model = %self.model, messages = messages.len(), "Calling Groq");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(self.timeout.as_secs())
                } else {
                    AgentError::Backend(format!("Groq request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Groq returned an error");
            return Err(AgentError::Backend(format!("Groq returned {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("Groq response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(AgentError::Backend("Groq returned empty response".to_string()));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer, key: &str) -> GroqBackend {
        GroqBackend::new(
            &format!("{}/openai/v1", server.uri()),
            key,
            "llama-3.1-8b-instant",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sends_system_then_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama-3.1-8b-instant",
                "messages": [
                    {"role": "system", "content": "You are Web_Agent."},
                    {"role": "user", "content": "NVDA news"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "- NVDA up 3% [Reuters]"}}]
            })))
            .mount(&server)
            .await;

        let reply = backend(&server, "test-key")
            .complete("You are Web_Agent.", &[BackendMessage::user("NVDA news")])
            .await
            .unwrap();
        assert_eq!(reply, "- NVDA up 3% [Reuters]");
    }

    #[tokio::test]
    async fn error_status_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = backend(&server, "test-key")
            .complete("sys", &[BackendMessage::user("q")])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Backend(ref msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn empty_choice_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = backend(&server, "test-key")
            .complete("sys", &[BackendMessage::user("q")])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Backend(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let server = MockServer::start().await;
        let err = backend(&server, "")
            .complete("sys", &[BackendMessage::user("q")])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Backend(ref msg) if msg.contains("not configured")));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let backend = GroqBackend::new(
            &server.uri(),
            "test-key",
            "llama-3.1-8b-instant",
            Duration::from_millis(200),
        )
        .unwrap();
        let err = backend
            .complete("sys", &[BackendMessage::user("q")])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)));
    }
}
