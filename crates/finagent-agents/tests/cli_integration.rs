//! Tests against the real `claude` CLI backend.
//!
//! Ignored by default. They need the `claude` CLI on PATH with working
//! credentials. Run explicitly with:
//! ```bash
//! cargo test -p finagent-agents --test cli_integration -- --ignored
//! ```

use std::sync::Arc;
use std::time::Duration;

use finagent_agents::claude_cli::{check_cli_available, ClaudeCliBackend, ClaudeCliConfig};
use finagent_agents::parser::{parse_step, AgentStep};
use finagent_agents::test_support::MockTool;
use finagent_agents::{Agent, BackendMessage, ReasoningAgent, ReasoningBackend, ToolCapability};

fn backend(model: &str, timeout_secs: u64) -> ClaudeCliBackend {
    ClaudeCliBackend::new(ClaudeCliConfig {
        model: model.to_string(),
        timeout: Duration::from_secs(timeout_secs),
    })
}

#[tokio::test]
#[ignore]
async fn cli_is_available() {
    assert!(
        check_cli_available().await,
        "claude CLI not found on PATH"
    );
}

/// The tool-call protocol must survive whatever wrapping the CLI adds.
#[tokio::test]
#[ignore]
async fn cli_tool_call_is_parseable() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let system_prompt = concat!(
        "You are a test agent. Reply ONLY with this JSON object and nothing else:\n",
        "{\"tool\": \"get_current_stock_price\", \"input\": {\"symbol\": \"NVDA\"}}\n",
    );

    let raw = backend("claude-3-5-haiku-latest", 30)
        .complete(system_prompt, &[BackendMessage::user("go")])
        .await
        .expect("Claude CLI invocation failed");

    match parse_step(&raw) {
        AgentStep::ToolCall { tool, input } => {
            assert_eq!(tool, "get_current_stock_price");
            assert_eq!(input["symbol"], "NVDA");
        }
        AgentStep::Final(text) => panic!("Expected a tool call, CLI returned:\n---\n{text}\n---"),
    }
}

/// A full reasoning turn: the model should call the mock price tool and
/// then answer with the price it observed.
#[tokio::test]
#[ignore]
async fn cli_agent_turn_uses_tool() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let price = MockTool::text("get_current_stock_price", "Current Price: 875.28 USD (NVDA)");
    let agent = ReasoningAgent::new(
        "Finance_Agent",
        "Report the current stock price.",
        vec!["State the live price on its own line as `Current Price: <value>`.".to_string()],
        vec![price.clone() as Arc<dyn ToolCapability>],
        Arc::new(backend("claude-3-5-haiku-latest", 60)),
    )
    .with_max_tool_calls(2);

    let turn = agent
        .run("What is NVDA trading at?", None)
        .await
        .expect("agent turn failed");

    assert!(!price.inputs().await.is_empty(), "tool was never called");
    assert!(turn.answer.contains("875.28"), "answer: {}", turn.answer);
}

#[tokio::test]
#[ignore]
async fn cli_reports_errors_for_invalid_model() {
    if !check_cli_available().await {
        eprintln!("Skipping: claude CLI not available");
        return;
    }

    let result = backend("nonexistent-model-12345", 15)
        .complete("You are a test.", &[BackendMessage::user("hello")])
        .await;

    assert!(result.is_err(), "Expected error for invalid model, got: {result:?}");
}
