use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use finagent_models::{
    AgentProfile, AgentsConfig, InvocationOutcome, ToolInvocation, ToolsConfig, Turn,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::{build_backend, BackendMessage, ReasoningBackend};
use crate::error::{AgentError, ToolError};
use crate::parser::{parse_step, AgentStep};
use crate::prompts::{
    agent_system_prompt, agent_user_prompt, budget_exhausted_prompt, tool_failure_observation,
    tool_observation,
};
use crate::tools::{build_toolset, ToolCapability};

pub const DEFAULT_MAX_TOOL_CALLS: usize = 4;

/// A named participant in an orchestration plan. Mockable for testing.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Answer `query`, optionally building on upstream `context`.
    ///
    /// Tool failures are recorded in the turn, never returned as errors.
    async fn run(&self, query: &str, context: Option<&str>) -> Result<Turn, AgentError>;
}

/// An agent that alternates between its reasoning backend and its tools.
pub struct ReasoningAgent {
    name: String,
    role: String,
    instructions: Vec<String>,
    tools: Vec<Arc<dyn ToolCapability>>,
    backend: Arc<dyn ReasoningBackend>,
    max_tool_calls: usize,
}

impl ReasoningAgent {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        instructions: Vec<String>,
        tools: Vec<Arc<dyn ToolCapability>>,
        backend: Arc<dyn ReasoningBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            instructions,
            tools,
            backend,
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
        }
    }

    /// Build an agent with the configured backend and the profile's toolset.
    pub fn from_profile(
        profile: &AgentProfile,
        agents: &AgentsConfig,
        tools: &ToolsConfig,
    ) -> Result<Self, AgentError> {
        let model = profile.model.as_deref().unwrap_or(&agents.backend.model);
        let backend = build_backend(&agents.backend, model)?;
        let toolset = build_toolset(profile.toolset, tools)?;

        Ok(Self::new(
            profile.name.clone(),
            profile.role.clone(),
            profile.instructions.clone(),
            toolset,
            backend,
        )
        .with_max_tool_calls(agents.max_tool_calls))
    }

    pub fn with_max_tool_calls(mut self, max_tool_calls: usize) -> Self {
        self.max_tool_calls = max_tool_calls;
        self
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    async fn complete(
        &self,
        system_prompt: &str,
        transcript: &[BackendMessage],
    ) -> Result<String, AgentError> {
        self.backend
            .complete(system_prompt, transcript)
            .await
            .map_err(|e| AgentError::Unavailable {
                agent: self.name.clone(),
                reason: e.to_string(),
            })
    }

    /// Run one tool call, record it, and return the observation for the backend.
    async fn call_tool(&self, turn: &mut Turn, tool: &str, input: Value) -> String {
        let start = Instant::now();
        let result = match self.tools.iter().find(|t| t.name() == tool) {
            Some(capability) => capability.invoke(&input).await,
            None => Err(ToolError::Unknown(tool.to_string())),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let (observation, outcome) = match result {
            Ok(output) => {
                debug!(agent = %self.name, %tool, elapsed_ms, "Tool call succeeded");
                (
                    tool_observation(tool, &output.render()),
                    InvocationOutcome::Success { output },
                )
            }
            Err(e) => {
                warn!(agent = %self.name, %tool, error = %e, elapsed_ms, "Tool call failed");
                (
                    tool_failure_observation(tool, &e.to_string()),
                    InvocationOutcome::Failure {
                        error: e.to_string(),
                    },
                )
            }
        };

        turn.invocations.push(ToolInvocation {
            tool: tool.to_string(),
            input,
            outcome,
            elapsed_ms,
        });
        observation
    }

    /// Replace an empty answer with a note, or fail if nothing explains it.
    fn settle_answer(&self, turn: &Turn, answer: String) -> Result<String, AgentError> {
        if !answer.trim().is_empty() {
            return Ok(answer);
        }

        let failed = turn.failed_tools();
        if failed.is_empty() {
            return Err(AgentError::Unavailable {
                agent: self.name.clone(),
                reason: "backend produced no final answer".to_string(),
            });
        }

        Ok(format!(
            "_{} could not complete its analysis. Unavailable data sources: {}._",
            self.name,
            failed.join(", ")
        ))
    }
}

#[async_trait]
impl Agent for ReasoningAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, query: &str, context: Option<&str>) -> Result<Turn, AgentError> {
        let start = Instant::now();
        let mut turn = Turn::new(&self.name, query, context);

        let system_prompt = agent_system_prompt(
            &self.name,
            &self.role,
            &self.instructions,
            &self.tools,
            self.max_tool_calls,
        );
        let mut transcript = vec![BackendMessage::user(agent_user_prompt(query, context))];
        let mut over_budget = false;

        let answer = loop {
            let reply = self.complete(&system_prompt, &transcript).await?;

            match parse_step(&reply) {
                AgentStep::Final(answer) => break answer,
                AgentStep::ToolCall { .. } if over_budget => {
                    warn!(agent = %self.name, "Tool call after budget was spent, ending turn");
                    break String::new();
                }
                AgentStep::ToolCall { .. } if turn.invocations.len() >= self.max_tool_calls => {
                    over_budget = true;
                    transcript.push(BackendMessage::assistant(reply));
                    transcript.push(BackendMessage::user(budget_exhausted_prompt(
                        self.max_tool_calls,
                    )));
                }
                AgentStep::ToolCall { tool, input } => {
                    let mut observation = self.call_tool(&mut turn, &tool, input).await;
                    if turn.invocations.len() >= self.max_tool_calls {
                        over_budget = true;
                        observation.push_str("\n\n");
                        observation.push_str(&budget_exhausted_prompt(self.max_tool_calls));
                    }
                    transcript.push(BackendMessage::assistant(reply));
                    transcript.push(BackendMessage::user(observation));
                }
            }
        };

        turn.answer = self.settle_answer(&turn, answer)?;
        turn.elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            agent = %self.name,
            tool_calls = turn.invocations.len(),
            failed_tool_calls = turn.failed_tools().len(),
            elapsed_ms = turn.elapsed_ms,
            "Agent turn complete"
        );
        Ok(turn)
    }
}
