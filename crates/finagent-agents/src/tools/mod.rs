//! External capabilities agents can invoke during a turn.

pub mod web_search;
pub mod yahoo;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use finagent_models::{ToolOutput, ToolsConfig, Toolset};
use serde_json::Value;

use crate::error::ToolError;

pub use web_search::WebSearchTool;
pub use yahoo::{YahooClient, YahooFinanceTool, YahooQuery};

/// Shape of the input a tool expects, shown to the reasoning backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInputSchema {
    FreeText,
    /// JSON Schema object.
    Structured(Value),
}

/// A named operation an agent may call. Mockable for testing.
#[async_trait]
pub trait ToolCapability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> ToolInputSchema;

    async fn invoke(&self, input: &Value) -> Result<ToolOutput, ToolError>;
}

/// Build the tools of one toolset, sharing a single HTTP client.
pub fn build_toolset(
    toolset: Toolset,
    config: &ToolsConfig,
) -> Result<Vec<Arc<dyn ToolCapability>>, ToolError> {
    let timeout = Duration::from_secs(config.http_timeout_seconds);
    match toolset {
        Toolset::WebSearch => Ok(vec![Arc::new(WebSearchTool::new(
            &config.search_base_url,
            config.max_results,
            timeout,
        )?)]),
        Toolset::MarketData => {
            let client = Arc::new(YahooClient::new(&config.yahoo_base_url, timeout)?);
            Ok(YahooQuery::ALL
                .into_iter()
                .map(|query| {
                    Arc::new(YahooFinanceTool::new(
                        Arc::clone(&client),
                        query,
                        config.max_results,
                    )) as Arc<dyn ToolCapability>
                })
                .collect())
        }
    }
}

/// Read a single text argument from a tool input.
///
/// Models send either a bare string or an object; for objects, `key` is tried
/// first and any other single string field is accepted as a fallback.
pub fn text_argument(input: &Value, key: &str) -> Result<String, ToolError> {
    let value = match input {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get(key).and_then(Value::as_str).or_else(|| {
            let mut strings = map.values().filter_map(Value::as_str);
            match (strings.next(), strings.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        }),
        _ => None,
    };

    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidInput(format!("expected `{key}`, got {input}")))
}

/// JSON Schema for a tool taking one required string field.
pub(crate) fn single_field_schema(key: &str, description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            key: {"type": "string", "description": description}
        },
        "required": [key]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_argument_forms() {
        assert_eq!(text_argument(&json!("NVDA"), "symbol").unwrap(), "NVDA");
        assert_eq!(text_argument(&json!({"symbol": " NVDA "}), "symbol").unwrap(), "NVDA");
        assert_eq!(text_argument(&json!({"ticker": "NVDA"}), "symbol").unwrap(), "NVDA");
    }

    #[test]
    fn text_argument_rejects_ambiguous_or_empty() {
        assert!(matches!(
            text_argument(&json!({"a": "x", "b": "y"}), "symbol"),
            Err(ToolError::InvalidInput(_))
        ));
        assert!(text_argument(&json!(""), "query").is_err());
        assert!(text_argument(&Value::Null, "query").is_err());
        assert!(text_argument(&json!(42), "query").is_err());
    }

    #[test]
    fn toolsets_expose_expected_names() {
        let config = ToolsConfig::default();

        let web = build_toolset(Toolset::WebSearch, &config).unwrap();
        assert_eq!(web.len(), 1);
        assert_eq!(web[0].name(), "web_search");

        let market = build_toolset(Toolset::MarketData, &config).unwrap();
        let names: Vec<&str> = market.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec![
                "get_current_stock_price",
                "get_company_news",
                "get_analyst_recommendations",
                "get_stock_fundamentals",
            ]
        );
    }
}
