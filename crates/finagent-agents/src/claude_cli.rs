use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::backend::{BackendMessage, MessageRole, ReasoningBackend};
use crate::error::AgentError;

/// Configuration for a Claude CLI invocation.
#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(45),
        }
    }
}

/// Invoke the `claude` CLI with a system prompt and user prompt.
/// Returns the raw stdout text.
pub async fn invoke_claude(
    system_prompt: &str,
    user_prompt: &str,
    config: &ClaudeCliConfig,
) -> Result<String, AgentError> {
    debug!(model = %config.model, "Invoking claude CLI");

    let result = tokio::time::timeout(config.timeout, async {
        Command::new("claude")
            .args([
                "-p",
                user_prompt,
                "--system-prompt",
                system_prompt,
                "--model",
                &config.model,
                "--output-format",
                "text",
            ])
            .kill_on_drop(true)
            .output()
            .await
    })
    .await
    .map_err(|_| AgentError::Timeout(config.timeout.as_secs()))?
    .map_err(|e| AgentError::Backend(format!("Failed to spawn claude: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        warn!(status = %result.status, stderr = %stderr, "Claude CLI failed");
        return Err(AgentError::Backend(format!(
            "claude exited {}: {}",
            result.status, stderr
        )));
    }

    let stdout = String::from_utf8_lossy(&result.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(AgentError::Backend(
            "Claude returned empty response".to_string(),
        ));
    }

    Ok(stdout)
}

/// Check if the `claude` CLI is available on the system.
pub async fn check_cli_available() -> bool {
    match Command::new("claude").arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Flatten a transcript into one prompt; the CLI takes a single `-p` message.
pub fn render_transcript(messages: &[BackendMessage]) -> String {
    if let [only] = messages {
        return only.content.clone();
    }

    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                MessageRole::User => "USER",
                MessageRole::Assistant => "ASSISTANT",
            };
            format!("### {speaker}\n{}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Reasoning backend that shells out to the Claude CLI once per step.
pub struct ClaudeCliBackend {
    config: ClaudeCliConfig,
}

impl ClaudeCliBackend {
    pub fn new(config: ClaudeCliConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ReasoningBackend for ClaudeCliBackend {
    fn name(&self) -> &str {
        "claude-cli"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[BackendMessage],
    ) -> Result<String, AgentError> {
        let prompt = render_transcript(messages);
        invoke_claude(system_prompt, &prompt, &self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClaudeCliConfig::default();
        assert_eq!(config.model, "claude-3-5-haiku-latest");
        assert_eq!(config.timeout, Duration::from_secs(45));
    }

    #[test]
    fn single_message_is_passed_verbatim() {
        let prompt = render_transcript(&[BackendMessage::user("## QUERY\nNVDA")]);
        assert_eq!(prompt, "## QUERY\nNVDA");
    }

    #[test]
    fn transcript_labels_speakers_in_order() {
        let prompt = render_transcript(&[
            BackendMessage::user("## QUERY\nNVDA"),
            BackendMessage::assistant(r#"{"tool": "get_current_stock_price"}"#),
            BackendMessage::user("TOOL RESULT get_current_stock_price: 875.28"),
        ]);
        let user = prompt.find("### USER").unwrap();
        let assistant = prompt.find("### ASSISTANT").unwrap();
        let result = prompt.find("TOOL RESULT").unwrap();
        assert!(user < assistant && assistant < result);
    }
}
