use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::price::{AppliedRate, PriceField};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// How trustworthy the reported price fields are.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceStatus {
    /// Extracted and, if needed, converted with a live rate.
    Present,
    /// Converted with the fallback rate.
    Estimated,
    /// No price fields; `price_note` says why.
    Unavailable,
}

/// One agent's attributed contribution to the narrative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    pub agent_name: String,
    pub answer: String,
    pub tool_calls: usize,
    pub failed_tool_calls: usize,
    pub elapsed_ms: u64,
}

/// An agent that could not produce a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentGap {
    pub agent_name: String,
    pub reason: String,
}

/// The final payload returned to a caller for one query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedReport {
    pub id: Uuid,
    pub schema_version: u32,
    pub query_id: Uuid,
    pub query: String,
    pub symbol: Option<String>,
    pub generated_at: DateTime<Utc>,
    /// Aggregated markdown narrative, sections in plan order.
    pub narrative: String,
    pub sections: Vec<AgentSection>,
    /// True when at least one planned agent was unavailable.
    pub partial: bool,
    pub gaps: Vec<AgentGap>,
    pub price_status: PriceStatus,
    pub price_note: Option<String>,
    pub price_fields: Vec<PriceField>,
    pub exchange_rate: Option<AppliedRate>,
    /// Set whenever a fallback rate was used for any field.
    pub estimated_conversion: bool,
    pub processing_time_ms: u64,
}

impl NormalizedReport {
    /// Price fields as `{"Stock Price (USD)": "$123.45", ...}`.
    pub fn price_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.price_fields
            .iter()
            .map(|f| (f.label.clone(), serde_json::Value::String(f.display.clone())))
            .collect()
    }

    /// Markdown rendering: price block, caveats, then the analysis summary.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        out.push_str("### Stock Price\n\n");
        match self.price_status {
            PriceStatus::Unavailable => {
                let why = self.price_note.as_deref().unwrap_or("no price found");
                out.push_str(&format!("_Stock price not available: {why}_\n"));
            }
            PriceStatus::Present | PriceStatus::Estimated => {
                for field in &self.price_fields {
                    out.push_str(&format!("- **{}**: {}\n", field.label, field.display));
                }
                if self.estimated_conversion {
                    if let Some(rate) = &self.exchange_rate {
                        out.push_str(&format!(
                            "\n_Converted with estimated rate 1 {} = {} {}_\n",
                            rate.base, rate.rate, rate.quote
                        ));
                    }
                }
            }
        }

        if self.partial {
            out.push_str("\n> Partial report. Unavailable agents:\n");
            for gap in &self.gaps {
                out.push_str(&format!("> - {}: {}\n", gap.agent_name, gap.reason));
            }
        }

        out.push_str("\n### Stock Analysis Summary\n\n");
        out.push_str(&self.narrative);
        if !self.narrative.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::{Currency, RateOrigin};
    use rust_decimal_macros::dec;

    fn sample_report() -> NormalizedReport {
        NormalizedReport {
            id: Uuid::new_v4(),
            schema_version: REPORT_SCHEMA_VERSION,
            query_id: Uuid::new_v4(),
            query: "Summarize analyst recommendations for NVDA".to_string(),
            symbol: Some("NVDA".to_string()),
            generated_at: Utc::now(),
            narrative: "## Web_Agent\n\n- Strong buy consensus [Reuters]\n".to_string(),
            sections: vec![AgentSection {
                agent_name: "Web_Agent".to_string(),
                answer: "- Strong buy consensus [Reuters]".to_string(),
                tool_calls: 1,
                failed_tool_calls: 0,
                elapsed_ms: 900,
            }],
            partial: false,
            gaps: vec![],
            price_status: PriceStatus::Estimated,
            price_note: None,
            price_fields: vec![
                PriceField::new(Currency::Usd, dec!(123.45)),
                PriceField::new(Currency::Inr, dec!(10789.53)),
            ],
            exchange_rate: Some(AppliedRate {
                base: Currency::Usd,
                quote: Currency::Inr,
                rate: dec!(87.4),
                origin: RateOrigin::Fallback,
            }),
            estimated_conversion: true,
            processing_time_ms: 2100,
        }
    }

    #[test]
    fn price_map_uses_labels() {
        let map = sample_report().price_map();
        assert_eq!(map["Stock Price (USD)"], "$123.45");
        assert_eq!(map["Stock Price (INR)"], "₹10789.53");
    }

    #[test]
    fn markdown_flags_estimated_rate() {
        let md = sample_report().to_markdown();
        assert!(md.contains("- **Stock Price (USD)**: $123.45"));
        assert!(md.contains("estimated rate 1 USD = 87.4 INR"));
        assert!(md.contains("### Stock Analysis Summary"));
    }

    #[test]
    fn markdown_explains_missing_price_and_gaps() {
        let mut report = sample_report();
        report.price_status = PriceStatus::Unavailable;
        report.price_note = Some("no price mentioned".to_string());
        report.price_fields.clear();
        report.partial = true;
        report.gaps.push(AgentGap {
            agent_name: "Finance_Agent".to_string(),
            reason: "backend unreachable".to_string(),
        });

        let md = report.to_markdown();
        assert!(md.contains("Stock price not available: no price mentioned"));
        assert!(md.contains("Finance_Agent: backend unreachable"));
        assert!(!md.contains("Stock Price (USD)"));
    }

    #[test]
    fn status_serialization() {
        assert_eq!(
            serde_json::to_string(&PriceStatus::Estimated).unwrap(),
            "\"estimated\""
        );
    }
}
