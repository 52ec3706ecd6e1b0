//! finagent - financial query agents
//!
//! Runs a web research agent and a market data agent in sequence over a
//! natural-language query, pulls the quoted stock price out of their answers
//! and reports it in both USD and INR.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use finagent::models::{FinagentConfig, Query};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = FinagentConfig::default();
//! let bridge = finagent::build_bridge(&config)?;
//! let report = bridge.submit(Query::new("Summarize analyst views").with_symbol("NVDA")).await?;
//! println!("{}", report.to_markdown());
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod error;
pub mod pipeline;
pub mod server;

pub use finagent_agents as agents;
pub use finagent_models as models;
pub use finagent_pricing as pricing;

pub use bridge::RequestBridge;
pub use error::{BridgeError, PipelineError};
pub use pipeline::Pipeline;

use std::sync::Arc;

use finagent_models::FinagentConfig;

/// Build the query pipeline from configuration.
pub fn build_pipeline(config: &FinagentConfig) -> Result<Pipeline, PipelineError> {
    Pipeline::from_config(config)
}

/// Build a request bridge over a freshly configured pipeline.
pub fn build_bridge(config: &FinagentConfig) -> Result<Arc<RequestBridge>, PipelineError> {
    let pipeline = Arc::new(build_pipeline(config)?);
    Ok(Arc::new(RequestBridge::new(pipeline, &config.bridge)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED_CONFIG: &str = include_str!("../../../config/finagent.toml");

    #[test]
    fn shipped_config_matches_defaults() {
        let config: FinagentConfig = toml::from_str(SHIPPED_CONFIG).unwrap();
        assert_eq!(config, FinagentConfig::default());
    }

    #[test]
    fn empty_config_builds_bridge() {
        let config: FinagentConfig = toml::from_str("").unwrap();
        let bridge = build_bridge(&config).unwrap();
        assert_eq!(bridge.max_workers(), 4);
    }
}
