use finagent_models::AgentGap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent {agent} unavailable: {reason}")]
    Unavailable { agent: String, reason: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Backend timed out after {0} seconds")]
    Timeout(u64),

    #[error("Agent response parse error: {0}")]
    Parse(String),

    #[error("Tool setup failed: {0}")]
    ToolSetup(#[from] ToolError),
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    Unknown(String),

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("No results for {0}")]
    NoResults(String),
}

#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("Orchestration plan has no steps")]
    EmptyPlan,

    #[error("Orchestration failed, no agent produced a turn: {}", describe_gaps(.failures))]
    Failed { failures: Vec<AgentGap> },
}

fn describe_gaps(gaps: &[AgentGap]) -> String {
    gaps.iter()
        .map(|g| format!("{} ({})", g.agent_name, g.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
