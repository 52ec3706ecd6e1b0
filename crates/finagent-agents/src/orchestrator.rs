use std::sync::Arc;
use std::time::Instant;

use finagent_models::{AgentGap, AgentSection, ContextTransform, Turn};
use tracing::{error, info, warn};

use crate::agent::Agent;
use crate::error::{AgentError, OrchestrationError};

/// One agent in a plan, with the rule for building its upstream context.
#[derive(Clone)]
pub struct PlanStep {
    pub agent: Arc<dyn Agent>,
    pub transform: ContextTransform,
}

impl PlanStep {
    pub fn new(agent: Arc<dyn Agent>, transform: ContextTransform) -> Self {
        Self { agent, transform }
    }
}

/// Ordered agent steps. The order is fixed at construction.
#[derive(Clone)]
pub struct OrchestrationPlan {
    steps: Vec<PlanStep>,
}

impl OrchestrationPlan {
    pub fn new(steps: Vec<PlanStep>) -> Result<Self, OrchestrationError> {
        if steps.is_empty() {
            return Err(OrchestrationError::EmptyPlan);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.agent.name()).collect()
    }
}

/// Successful turns and unavailable agents of one run, both in plan order.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub turns: Vec<Turn>,
    pub gaps: Vec<AgentGap>,
}

impl Aggregate {
    /// Markdown narrative: one `## <Agent_Name>` section per turn, answers verbatim.
    pub fn text(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("## {}\n\n{}", t.agent_name, t.answer.trim_end()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn sections(&self) -> Vec<AgentSection> {
        self.turns
            .iter()
            .map(|t| AgentSection {
                agent_name: t.agent_name.clone(),
                answer: t.answer.clone(),
                tool_calls: t.invocations.len(),
                failed_tool_calls: t.failed_tools().len(),
                elapsed_ms: t.elapsed_ms,
            })
            .collect()
    }

    pub fn is_partial(&self) -> bool {
        !self.gaps.is_empty()
    }

    pub fn turn(&self, agent_name: &str) -> Option<&Turn> {
        self.turns.iter().find(|t| t.agent_name == agent_name)
    }
}

/// Runs a plan's agents one after another, feeding each the answers before it.
pub struct Orchestrator {
    plan: OrchestrationPlan,
}

impl Orchestrator {
    pub fn new(plan: OrchestrationPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &OrchestrationPlan {
        &self.plan
    }

    /// Execute every step in order. A failed agent becomes a gap and the run
    /// continues; only a run where every agent failed is an error.
    pub async fn execute(&self, query: &str) -> Result<Aggregate, OrchestrationError> {
        let start = Instant::now();
        info!(steps = self.plan.steps.len(), "Starting orchestration");

        let mut prior: Vec<Prior> = Vec::with_capacity(self.plan.steps.len());
        let mut turns = Vec::new();
        let mut gaps = Vec::new();

        for step in &self.plan.steps {
            let name = step.agent.name().to_string();
            let context = build_context(&step.transform, &prior);

            let agent_start = Instant::now();
            let result = step.agent.run(query, context.as_deref()).await;
            let elapsed_ms = agent_start.elapsed().as_millis() as u64;

            match result {
                Ok(turn) => {
                    info!(
                        agent = %name,
                        tool_calls = turn.invocations.len(),
                        elapsed_ms,
                        "Agent succeeded"
                    );
                    prior.push(Prior {
                        agent: name,
                        answer: Some(turn.answer.clone()),
                    });
                    turns.push(turn);
                }
                Err(e) => {
                    warn!(agent = %name, error = %e, elapsed_ms, "Agent failed");
                    gaps.push(AgentGap {
                        agent_name: name.clone(),
                        reason: gap_reason(e),
                    });
                    prior.push(Prior {
                        agent: name,
                        answer: None,
                    });
                }
            }
        }

        if turns.is_empty() {
            error!(
                agents = gaps.len(),
                elapsed_ms = start.elapsed().as_millis(),
                "Every agent failed"
            );
            return Err(OrchestrationError::Failed { failures: gaps });
        }

        info!(
            succeeded = turns.len(),
            gaps = gaps.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Orchestration complete"
        );
        Ok(Aggregate { turns, gaps })
    }
}

/// Answer of an earlier step; `None` when that agent failed.
struct Prior {
    agent: String,
    answer: Option<String>,
}

fn attributed(prior: &Prior) -> Option<String> {
    prior
        .answer
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| format!("[{}]\n{a}", prior.agent))
}

fn concatenated(prior: &[Prior]) -> String {
    prior
        .iter()
        .filter_map(attributed)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_context(transform: &ContextTransform, prior: &[Prior]) -> Option<String> {
    let context = match transform {
        ContextTransform::Isolated => return None,
        ContextTransform::Concatenate => concatenated(prior),
        ContextTransform::PreviousOnly => prior.last().and_then(attributed).unwrap_or_default(),
        ContextTransform::Truncate { max_chars } => {
            concatenated(prior).chars().take(*max_chars).collect()
        }
    };
    (!context.is_empty()).then_some(context)
}

fn gap_reason(error: AgentError) -> String {
    match error {
        AgentError::Unavailable { reason, .. } => reason,
        other => other.to_string(),
    }
}
