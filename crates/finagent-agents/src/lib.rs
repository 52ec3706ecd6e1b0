pub mod agent;
pub mod backend;
pub mod claude_cli;
pub mod error;
pub mod groq;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod tools;

pub mod test_support;

pub use agent::{Agent, ReasoningAgent};
pub use backend::{build_backend, BackendMessage, ReasoningBackend};
pub use error::{AgentError, OrchestrationError, ToolError};
pub use orchestrator::{Aggregate, OrchestrationPlan, Orchestrator, PlanStep};
pub use tools::{build_toolset, ToolCapability, ToolInputSchema};
