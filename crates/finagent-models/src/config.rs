use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::price::Currency;

/// INR per USD used when the live rate cannot be fetched.
pub const FALLBACK_USD_INR_RATE: Decimal = Decimal::from_parts(874, 0, 0, false, 1);

/// Top-level configuration. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FinagentConfig {
    pub agents: AgentsConfig,
    pub tools: ToolsConfig,
    pub currency: CurrencyConfig,
    pub symbols: SymbolConfig,
    pub bridge: BridgeConfig,
}

/// How upstream answers are turned into a plan step's context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ContextTransform {
    /// All prior answers, in plan order.
    #[default]
    Concatenate,
    /// Only the immediately preceding step's answer.
    PreviousOnly,
    /// No upstream context.
    Isolated,
    /// All prior answers, cut to at most `max_chars` characters.
    Truncate { max_chars: usize },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Toolset {
    WebSearch,
    MarketData,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Groq,
    ClaudeCli,
}

/// Configuration for the agent orchestration layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    /// Tool calls an agent may make before it must answer.
    pub max_tool_calls: usize,
    pub backend: BackendConfig,
    /// Plan steps, executed in this order.
    pub plan: Vec<AgentProfile>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: 4,
            backend: BackendConfig::default(),
            plan: vec![AgentProfile::web_agent(), AgentProfile::finance_agent()],
        }
    }
}

/// Reasoning backend shared by all agents unless a profile overrides the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub model: String,
    pub timeout_seconds: u64,
    /// OpenAI-compatible endpoint root (groq only).
    pub base_url: String,
    /// Environment variable holding the API key (groq only).
    pub api_key_env: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Groq,
            model: "llama-3.1-8b-instant".to_string(),
            timeout_seconds: 60,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

/// Configuration for a single agent in the plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProfile {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub toolset: Toolset,
    /// Override model for this agent. Falls back to `BackendConfig::model`.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub context: ContextTransform,
}

impl AgentProfile {
    pub fn web_agent() -> Self {
        Self {
            name: "Web_Agent".to_string(),
            role: "Find stock-related news and recent updates from the internet.".to_string(),
            instructions: vec![
                "Always include sources.".to_string(),
                "Prefer official reports over general news.".to_string(),
                "Summarize findings concisely.".to_string(),
            ],
            toolset: Toolset::WebSearch,
            model: None,
            context: ContextTransform::Concatenate,
        }
    }

    pub fn finance_agent() -> Self {
        Self {
            name: "Finance_Agent".to_string(),
            role: "Analyze stock performance, trends, fundamental metrics, and SEC Filings."
                .to_string(),
            instructions: vec![
                "Use bullet points for clarity.".to_string(),
                "Include key financial ratios.".to_string(),
                "Cross-check financial data before summarizing.".to_string(),
                "State the live price on its own line as `Current Price: <value>`.".to_string(),
            ],
            toolset: Toolset::MarketData,
            model: None,
            context: ContextTransform::Concatenate,
        }
    }
}

/// HTTP settings for the tool clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub http_timeout_seconds: u64,
    pub search_base_url: String,
    pub yahoo_base_url: String,
    /// Results kept per search or news lookup.
    pub max_results: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            http_timeout_seconds: 15,
            search_base_url: "https://api.duckduckgo.com".to_string(),
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            max_results: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CurrencyConfig {
    /// Currency prices are normalized to unless the query overrides it.
    pub display: Currency,
    /// Currency of listings on domestic exchanges.
    pub domestic: Currency,
    /// Currency assumed for every other listing.
    pub foreign: Currency,
    /// Rate endpoint root; the base currency code is appended.
    pub rate_base_url: String,
    /// Domestic units per foreign unit when the live lookup fails.
    pub fallback_rate: Decimal,
    pub rate_cache_ttl_seconds: u64,
    pub rate_timeout_seconds: u64,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            display: Currency::Inr,
            domestic: Currency::Inr,
            foreign: Currency::Usd,
            rate_base_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            fallback_rate: FALLBACK_USD_INR_RATE,
            rate_cache_ttl_seconds: 600,
            rate_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SymbolConfig {
    /// Exchange suffixes that mark a domestic listing.
    pub domestic_suffixes: Vec<String>,
    /// Suffix appended to bare tickers when `assume_domestic` is set.
    pub default_suffix: String,
    pub assume_domestic: bool,
}

impl Default for SymbolConfig {
    fn default() -> Self {
        Self {
            domestic_suffixes: vec![".NS".to_string(), ".BO".to_string()],
            default_suffix: ".NS".to_string(),
            assume_domestic: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    pub max_concurrent_queries: usize,
    /// Deadline per query, enforced at the worker pool boundary.
    pub query_timeout_seconds: u64,
    pub bind: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_queries: 4,
            query_timeout_seconds: 180,
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}
