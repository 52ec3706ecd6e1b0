use std::time::Duration;

use finagent_agents::{AgentError, OrchestrationError};
use finagent_pricing::RateError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to build agent: {0}")]
    Agent(#[from] AgentError),

    #[error("Failed to build rate provider: {0}")]
    RateProvider(#[from] RateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Bridge is shutting down")]
    ShuttingDown,

    #[error("Query worker failed: {0}")]
    Worker(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
