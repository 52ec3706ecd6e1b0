use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::price::Currency;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Full plan: news gathering, market analysis, price normalization.
    #[default]
    Analysis,
    /// Web agents only; no price extraction.
    News,
}

/// A caller's question, as received by a transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub id: Uuid,
    pub text: String,
    /// Ticker the question is about. Also serves as the market hint.
    pub symbol: Option<String>,
    /// Overrides the configured display currency.
    pub display_currency: Option<Currency>,
    #[serde(default)]
    pub kind: QueryKind,
    pub submitted_at: DateTime<Utc>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            symbol: None,
            display_currency: None,
            kind: QueryKind::Analysis,
            submitted_at: Utc::now(),
        }
    }

    /// A stock-analysis query built from a bare symbol.
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        let text = format!(
            "Summarize the latest news, analyst recommendations and current price for {symbol}"
        );
        Self::new(text).with_symbol(symbol)
    }

    pub fn news(topic: impl Into<String>) -> Self {
        let mut query = Self::new(topic);
        query.kind = QueryKind::News;
        query
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into().trim().to_string();
        self.symbol = (!symbol.is_empty()).then_some(symbol);
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.display_currency = Some(currency);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_symbol_builds_text_and_symbol() {
        let query = Query::for_symbol("NVDA");
        assert_eq!(query.symbol.as_deref(), Some("NVDA"));
        assert!(query.text.contains("NVDA"));
        assert_eq!(query.kind, QueryKind::Analysis);
    }

    #[test]
    fn blank_symbol_is_dropped() {
        let query = Query::new("market news").with_symbol("   ");
        assert!(query.symbol.is_none());
    }

    #[test]
    fn news_query_kind() {
        let query = Query::news("TataMotors stock news");
        assert_eq!(query.kind, QueryKind::News);
        assert!(query.symbol.is_none());
    }

    #[test]
    fn kind_defaults_when_missing() {
        let json = serde_json::json!({
            "id": Uuid::nil(),
            "text": "NVDA outlook",
            "symbol": null,
            "display_currency": "INR",
            "submitted_at": "2026-01-05T10:00:00Z"
        });
        let query: Query = serde_json::from_value(json).unwrap();
        assert_eq!(query.kind, QueryKind::Analysis);
        assert_eq!(query.display_currency, Some(Currency::Inr));
    }
}
