use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result payload of a successful tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolOutput {
    Text(String),
    Json(serde_json::Value),
}

impl ToolOutput {
    /// Text form handed back to the reasoning backend as an observation.
    pub fn render(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success { output: ToolOutput },
    Failure { error: String },
}

/// One tool call made during a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    pub tool: String,
    pub input: serde_json::Value,
    pub outcome: InvocationOutcome,
    pub elapsed_ms: u64,
}

impl ToolInvocation {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Success { .. })
    }
}

/// One agent's execution record for a single query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub id: Uuid,
    pub agent_name: String,
    pub query: String,
    /// Upstream context the agent was given, if any.
    pub context: Option<String>,
    pub invocations: Vec<ToolInvocation>,
    pub answer: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl Turn {
    pub fn new(agent_name: impl Into<String>, query: &str, context: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_name: agent_name.into(),
            query: query.to_string(),
            context: context.map(str::to_string),
            invocations: Vec::new(),
            answer: String::new(),
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    pub fn has_answer(&self) -> bool {
        !self.answer.trim().is_empty()
    }

    /// Names of tools whose invocation failed, in call order.
    pub fn failed_tools(&self) -> Vec<&str> {
        self.invocations
            .iter()
            .filter(|inv| !inv.succeeded())
            .map(|inv| inv.tool.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(tool: &str, ok: bool) -> ToolInvocation {
        ToolInvocation {
            tool: tool.to_string(),
            input: serde_json::json!({"symbol": "NVDA"}),
            outcome: if ok {
                InvocationOutcome::Success {
                    output: ToolOutput::Text("ok".to_string()),
                }
            } else {
                InvocationOutcome::Failure {
                    error: "timeout".to_string(),
                }
            },
            elapsed_ms: 12,
        }
    }

    #[test]
    fn failed_tools_in_call_order() {
        let mut turn = Turn::new("Finance_Agent", "NVDA", None);
        turn.invocations.push(invocation("get_company_news", false));
        turn.invocations.push(invocation("get_current_stock_price", true));
        turn.invocations.push(invocation("get_stock_fundamentals", false));

        assert_eq!(
            turn.failed_tools(),
            vec!["get_company_news", "get_stock_fundamentals"]
        );
    }

    #[test]
    fn blank_answer_is_not_an_answer() {
        let mut turn = Turn::new("Web_Agent", "NVDA", Some("prior"));
        assert!(!turn.has_answer());
        turn.answer = "  \n".to_string();
        assert!(!turn.has_answer());
        turn.answer = "- NVDA beat estimates".to_string();
        assert!(turn.has_answer());
        assert_eq!(turn.context.as_deref(), Some("prior"));
    }

    #[test]
    fn json_output_renders_pretty() {
        let output = ToolOutput::Json(serde_json::json!({"price": 123.45}));
        assert!(output.render().contains("\"price\": 123.45"));
    }

    #[test]
    fn outcome_is_tagged() {
        let json = serde_json::to_value(invocation("search", false)).unwrap();
        assert_eq!(json["outcome"]["status"], "failure");
        assert_eq!(json["outcome"]["error"], "timeout");
    }
}
