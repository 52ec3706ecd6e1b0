use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use finagent_models::{BackendConfig, BackendKind};
use serde::{Deserialize, Serialize};

use crate::claude_cli::{ClaudeCliBackend, ClaudeCliConfig};
use crate::error::AgentError;
use crate::groq::GroqBackend;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// One entry of an agent's running transcript with its backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendMessage {
    pub role: MessageRole,
    pub content: String,
}

impl BackendMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// The reasoning model an agent consults. Mockable for testing.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Produce the next assistant reply for the transcript.
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[BackendMessage],
    ) -> Result<String, AgentError>;
}

/// Build the configured backend for one agent.
///
/// `model` is the agent's effective model (profile override or the default).
pub fn build_backend(
    config: &BackendConfig,
    model: &str,
) -> Result<Arc<dyn ReasoningBackend>, AgentError> {
    let timeout = Duration::from_secs(config.timeout_seconds);
    match config.kind {
        BackendKind::ClaudeCli => Ok(Arc::new(ClaudeCliBackend::new(ClaudeCliConfig {
            model: model.to_string(),
            timeout,
        }))),
        BackendKind::Groq => {
            let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
            let backend = GroqBackend::new(&config.base_url, api_key, model, timeout)?;
            Ok(Arc::new(backend))
        }
    }
}
