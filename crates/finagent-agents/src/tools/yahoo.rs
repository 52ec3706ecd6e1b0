use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use finagent_models::ToolOutput;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{single_field_schema, text_argument, ToolCapability, ToolInputSchema};
use crate::error::ToolError;

const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; finagent/", env!("CARGO_PKG_VERSION"), ")");

/// Thin JSON client for the public Yahoo Finance endpoints.
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ToolError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "Yahoo Finance request");

        let response = self.client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ToolError::Malformed(e.to_string()))
    }

    /// Latest regular-market price from the chart endpoint.
    pub async fn current_price(&self, symbol: &str) -> Result<String, ToolError> {
        let body = self
            .get_json(
                &format!("/v8/finance/chart/{symbol}"),
                &[("interval", "1d".into()), ("range", "1d".into())],
            )
            .await?;

        let meta = first_result(&body, "chart", symbol)?
            .get("meta")
            .ok_or_else(|| ToolError::Malformed("chart result without meta".to_string()))?;
        let price = meta
            .get("regularMarketPrice")
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::NoResults(symbol.to_string()))?;

        let currency = meta.get("currency").and_then(Value::as_str).unwrap_or("USD");
        let mut line = format!("Current Price: {price:.2} {currency} ({symbol}");
        if let Some(exchange) = meta.get("exchangeName").and_then(Value::as_str) {
            line.push_str(&format!(", {exchange}"));
        }
        line.push_str(") [Yahoo Finance]");
        Ok(line)
    }

    /// Recent headlines mentioning the symbol, one cited line each.
    pub async fn company_news(&self, symbol: &str, count: usize) -> Result<String, ToolError> {
        let body = self
            .get_json(
                "/v1/finance/search",
                &[
                    ("q", symbol.to_string()),
                    ("newsCount", count.to_string()),
                    ("quotesCount", "0".into()),
                ],
            )
            .await?;

        let lines: Vec<String> = body
            .get("news")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let title = item.get("title")?.as_str()?;
                        let link = item.get("link").and_then(Value::as_str).unwrap_or("");
                        let publisher = item
                            .get("publisher")
                            .and_then(Value::as_str)
                            .unwrap_or("Yahoo Finance");
                        Some(format!("- {title} [{publisher}]({link})"))
                    })
                    .take(count)
                    .collect()
            })
            .unwrap_or_default();

        if lines.is_empty() {
            return Err(ToolError::NoResults(symbol.to_string()));
        }
        Ok(lines.join("\n"))
    }

    /// Selected quoteSummary modules, with `{raw, fmt}` pairs collapsed to `fmt`.
    pub async fn quote_summary(&self, symbol: &str, modules: &[&str]) -> Result<Value, ToolError> {
        let body = self
            .get_json(
                &format!("/v10/finance/quoteSummary/{symbol}"),
                &[("modules", modules.join(","))],
            )
            .await?;

        let result = first_result(&body, "quoteSummary", symbol)?;
        let mut summary = serde_json::Map::new();
        for module in modules {
            if let Some(value) = result.get(*module) {
                summary.insert((*module).to_string(), simplify(value));
            }
        }

        if summary.is_empty() {
            return Err(ToolError::NoResults(symbol.to_string()));
        }
        Ok(Value::Object(summary))
    }
}

/// `body[root].result[0]`, mapping Yahoo's in-band error object to `NoResults`.
fn first_result<'a>(body: &'a Value, root: &str, symbol: &str) -> Result<&'a Value, ToolError> {
    let root = body
        .get(root)
        .ok_or_else(|| ToolError::Malformed(format!("missing `{root}`")))?;

    match root.get("result").and_then(Value::as_array).and_then(|r| r.first()) {
        Some(result) => Ok(result),
        None => {
            let reason = root
                .get("error")
                .and_then(|e| e.get("description"))
                .and_then(Value::as_str)
                .unwrap_or("empty result");
            debug!(%symbol, %reason, "Yahoo Finance returned no result");
            Err(ToolError::NoResults(symbol.to_string()))
        }
    }
}

fn simplify(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(fmt) = map.get("fmt").filter(|f| f.is_string()) {
                return fmt.clone();
            }
            if let Some(raw) = map.get("raw") {
                return raw.clone();
            }
            if map.is_empty() {
                return Value::Null;
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), simplify(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(simplify).collect()),
        other => other.clone(),
    }
}

/// The market-data operations exposed to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YahooQuery {
    Price,
    News,
    Recommendations,
    Fundamentals,
}

impl YahooQuery {
    pub const ALL: [YahooQuery; 4] = [
        YahooQuery::Price,
        YahooQuery::News,
        YahooQuery::Recommendations,
        YahooQuery::Fundamentals,
    ];

    pub fn tool_name(self) -> &'static str {
        match self {
            YahooQuery::Price => "get_current_stock_price",
            YahooQuery::News => "get_company_news",
            YahooQuery::Recommendations => "get_analyst_recommendations",
            YahooQuery::Fundamentals => "get_stock_fundamentals",
        }
    }

    fn description(self) -> &'static str {
        match self {
            YahooQuery::Price => "Latest market price of a ticker, with its trading currency.",
            YahooQuery::News => "Recent news headlines about a ticker, with links.",
            YahooQuery::Recommendations => {
                "Analyst recommendation counts (strong buy to strong sell) by period."
            }
            YahooQuery::Fundamentals => {
                "Valuation, profitability and balance sheet metrics such as P/E, \
                 margins, market cap and debt to equity."
            }
        }
    }
}

/// The `symbol` argument, uppercased. Only characters that appear in Yahoo
/// tickers are accepted since the symbol becomes part of the request path.
fn ticker_argument(input: &Value) -> Result<String, ToolError> {
    let symbol = text_argument(input, "symbol")?.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= 24
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-'));
    if !valid {
        return Err(ToolError::InvalidInput(format!("not a ticker symbol: {symbol:?}")));
    }
    Ok(symbol)
}

/// One Yahoo Finance operation as a tool.
pub struct YahooFinanceTool {
    client: Arc<YahooClient>,
    query: YahooQuery,
    max_results: usize,
}

impl YahooFinanceTool {
    pub fn new(client: Arc<YahooClient>, query: YahooQuery, max_results: usize) -> Self {
        Self {
            client,
            query,
            max_results,
        }
    }
}

#[async_trait]
impl ToolCapability for YahooFinanceTool {
    fn name(&self) -> &str {
        self.query.tool_name()
    }

    fn description(&self) -> &str {
        self.query.description()
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::Structured(single_field_schema(
            "symbol",
            "Ticker symbol, e.g. NVDA or INFY.NS",
        ))
    }

    async fn invoke(&self, input: &Value) -> Result<ToolOutput, ToolError> {
        let symbol = ticker_argument(input)?;
        match self.query {
            YahooQuery::Price => self.client.current_price(&symbol).await.map(ToolOutput::Text),
            YahooQuery::News => self
                .client
                .company_news(&symbol, self.max_results)
                .await
                .map(ToolOutput::Text),
            YahooQuery::Recommendations => {
                let summary = self
                    .client
                    .quote_summary(&symbol, &["recommendationTrend"])
                    .await?;
                let trend = summary
                    .get("recommendationTrend")
                    .and_then(|r| r.get("trend"))
                    .cloned()
                    .ok_or_else(|| ToolError::NoResults(symbol.clone()))?;
                Ok(ToolOutput::Json(trend))
            }
            YahooQuery::Fundamentals => self
                .client
                .quote_summary(
                    &symbol,
                    &["summaryDetail", "defaultKeyStatistics", "financialData"],
                )
                .await
                .map(ToolOutput::Json),
        }
    }
}
