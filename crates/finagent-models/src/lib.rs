pub mod config;
pub mod price;
pub mod query;
pub mod report;
pub mod turn;

pub use config::{
    AgentProfile, AgentsConfig, BackendConfig, BackendKind, BridgeConfig, ContextTransform,
    CurrencyConfig, FinagentConfig, SymbolConfig, ToolsConfig, Toolset,
};
pub use price::{AppliedRate, Currency, ExtractedPrice, Market, PriceField, RateOrigin};
pub use query::{Query, QueryKind};
pub use report::{AgentGap, AgentSection, NormalizedReport, PriceStatus};
pub use turn::{InvocationOutcome, ToolInvocation, ToolOutput, Turn};
