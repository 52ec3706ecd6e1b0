use std::sync::Arc;

use crate::tools::{ToolCapability, ToolInputSchema};

/// Reply format every agent is taught in its system prompt.
fn protocol_section(max_tool_calls: usize) -> String {
    let example = serde_json::json!({
        "tool": "<tool name>",
        "input": {"symbol": "NVDA"}
    });
    let example = serde_json::to_string_pretty(&example).unwrap_or_default();

    format!(
        "## PROTOCOL\n\n\
         To use a tool, reply with ONLY a JSON object of this shape and nothing else:\n\
         ```json\n{example}\n```\n\
         Tools taking free text accept a plain string as `input`.\n\
         You may call at most {max_tool_calls} tools. Each result is sent back to you \
         as an OBSERVATION.\n\
         When you have enough information, reply with your final answer in markdown \
         instead of JSON. Never invent figures a tool did not return."
    )
}

fn tools_section(tools: &[Arc<dyn ToolCapability>]) -> String {
    if tools.is_empty() {
        return "## TOOLS\n\nNo tools are available. Answer from the context you are given."
            .to_string();
    }

    let mut section = String::from("## TOOLS\n");
    for tool in tools {
        let input = match tool.input_schema() {
            ToolInputSchema::FreeText => "free text".to_string(),
            ToolInputSchema::Structured(schema) => schema.to_string(),
        };
        section.push_str(&format!(
            "\n- `{}`: {} Input: {input}",
            tool.name(),
            tool.description()
        ));
    }
    section
}

/// System prompt for one agent: identity, role, instructions, tools, protocol.
pub fn agent_system_prompt(
    name: &str,
    role: &str,
    instructions: &[String],
    tools: &[Arc<dyn ToolCapability>],
    max_tool_calls: usize,
) -> String {
    let mut prompt = format!("You are {name}, a financial research agent.\n\n## ROLE\n\n{role}\n");

    if !instructions.is_empty() {
        prompt.push_str("\n## INSTRUCTIONS\n\n");
        for instruction in instructions {
            prompt.push_str(&format!("- {instruction}\n"));
        }
    }

    prompt.push('\n');
    prompt.push_str(&tools_section(tools));
    prompt.push_str("\n\n");
    prompt.push_str(&protocol_section(max_tool_calls));
    prompt
}

/// First user message of a turn.
///
/// Upstream answers are framed as context to build on; the team guidelines
/// only apply to agents that receive such context.
pub fn agent_user_prompt(query: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "## CONTEXT FROM PREVIOUS AGENTS\n\n{context}\n\n\
             Build on the context above. Keep its sources, structure the answer with \
             bullet points and cite where each figure comes from.\n\n\
             ## QUERY\n\n{query}"
        ),
        None => format!("## QUERY\n\n{query}"),
    }
}

/// Observation fed back after a successful tool call.
pub fn tool_observation(tool: &str, output: &str) -> String {
    format!("OBSERVATION from `{tool}`:\n{output}")
}

/// Observation fed back after a failed or unknown tool call.
pub fn tool_failure_observation(tool: &str, error: &str) -> String {
    format!(
        "OBSERVATION from `{tool}`: the call FAILED ({error}). \
         Continue with other tools or answer with what you have."
    )
}

/// Sent when the tool budget is spent.
pub fn budget_exhausted_prompt(max_tool_calls: usize) -> String {
    format!(
        "You have used all {max_tool_calls} tool calls. Do not call any more tools. \
         Reply now with your final answer in markdown."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockTool;

    #[test]
    fn system_prompt_lists_role_instructions_and_tools() {
        let tools = vec![
            MockTool::text("get_current_stock_price", "Current Price: 875.28")
                as Arc<dyn ToolCapability>,
        ];
        let prompt = agent_system_prompt(
            "Finance_Agent",
            "Analyze stock performance.",
            &["Use bullet points for clarity.".to_string()],
            &tools,
            4,
        );

        assert!(prompt.starts_with("You are Finance_Agent"));
        assert!(prompt.contains("## ROLE\n\nAnalyze stock performance."));
        assert!(prompt.contains("- Use bullet points for clarity."));
        assert!(prompt.contains("`get_current_stock_price`"));
        assert!(prompt.contains("at most 4 tools"));
    }

    #[test]
    fn system_prompt_without_tools() {
        let prompt = agent_system_prompt("Writer", "Summarize.", &[], &[], 2);
        assert!(prompt.contains("No tools are available"));
        assert!(!prompt.contains("## INSTRUCTIONS"));
    }

    #[test]
    fn user_prompt_with_and_without_context() {
        assert_eq!(agent_user_prompt("NVDA news", None), "## QUERY\n\nNVDA news");
        assert_eq!(agent_user_prompt("NVDA news", Some("   ")), "## QUERY\n\nNVDA news");

        let prompt = agent_user_prompt("NVDA price", Some("[Web_Agent]\n- up 3%"));
        assert!(prompt.starts_with("## CONTEXT FROM PREVIOUS AGENTS\n\n[Web_Agent]\n- up 3%"));
        assert!(prompt.ends_with("## QUERY\n\nNVDA price"));
    }
}
