use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use finagent_agents::{Agent, OrchestrationPlan, Orchestrator, PlanStep, ReasoningAgent};
use finagent_models::report::REPORT_SCHEMA_VERSION;
use finagent_models::{
    AppliedRate, Currency, FinagentConfig, NormalizedReport, PriceField, PriceStatus, Query,
    QueryKind, Toolset,
};
use finagent_pricing::{CurrencyNormalizer, ExchangeRateApi, PriceExtractor, RateProvider};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::PipelineError;

/// Note attached when a query does not ask for a price.
pub const PRICE_NOT_REQUESTED: &str = "price lookup not requested";
/// Note attached when no agent mentioned a price.
pub const NO_PRICE_MENTIONED: &str = "no price mentioned";

/// Everything one query needs: orchestration, extraction, normalization.
///
/// Immutable after construction; shared across workers as `Arc<Pipeline>`.
pub struct Pipeline {
    analysis: Orchestrator,
    /// Web-search agents only. `None` when the plan has none.
    news: Option<Orchestrator>,
    extractor: PriceExtractor,
    normalizer: CurrencyNormalizer,
    display_currency: Currency,
    assume_domestic: bool,
}

impl Pipeline {
    pub fn new(
        analysis: Orchestrator,
        news: Option<Orchestrator>,
        extractor: PriceExtractor,
        normalizer: CurrencyNormalizer,
        display_currency: Currency,
    ) -> Self {
        Self {
            analysis,
            news,
            extractor,
            normalizer,
            display_currency,
            assume_domestic: false,
        }
    }

    /// Build agents, tools, backends and the rate source from configuration.
    pub fn from_config(config: &FinagentConfig) -> Result<Self, PipelineError> {
        let mut analysis_steps = Vec::new();
        let mut news_steps = Vec::new();

        for profile in &config.agents.plan {
            let agent: Arc<dyn Agent> = Arc::new(ReasoningAgent::from_profile(
                profile,
                &config.agents,
                &config.tools,
            )?);
            let step = PlanStep::new(agent, profile.context.clone());
            if profile.toolset == Toolset::WebSearch {
                news_steps.push(step.clone());
            }
            analysis_steps.push(step);
        }

        let analysis = Orchestrator::new(OrchestrationPlan::new(analysis_steps)?);
        let news = if news_steps.is_empty() {
            None
        } else {
            Some(Orchestrator::new(OrchestrationPlan::new(news_steps)?))
        };

        let rates: Arc<dyn RateProvider> = Arc::new(ExchangeRateApi::new(
            config.currency.rate_base_url.clone(),
            Duration::from_secs(config.currency.rate_timeout_seconds),
        )?);

        Ok(Self::new(
            analysis,
            news,
            PriceExtractor::from_config(&config.symbols, &config.currency),
            CurrencyNormalizer::new(rates, &config.currency),
            config.currency.display,
        )
        .with_assume_domestic(config.symbols.assume_domestic))
    }

    /// Treat bare tickers as domestic listings by appending the default suffix.
    pub fn with_assume_domestic(mut self, assume_domestic: bool) -> Self {
        self.assume_domestic = assume_domestic;
        self
    }

    /// Run one query through orchestration, price extraction and normalization.
    pub async fn run(&self, query: &Query) -> Result<NormalizedReport, PipelineError> {
        let start = Instant::now();
        info!(query_id = %query.id, kind = ?query.kind, "Running query");

        let symbol = query.symbol.as_deref().map(|s| {
            if self.assume_domestic {
                self.extractor.classifier().normalize_symbol(s)
            } else {
                s.trim().to_string()
            }
        });

        let orchestrator = match query.kind {
            QueryKind::Analysis => &self.analysis,
            QueryKind::News => self.news.as_ref().ok_or_else(|| {
                PipelineError::Config("news query requires a web search agent in the plan".into())
            })?,
        };

        let agent_query = match &symbol {
            Some(symbol) => format!("{}\n\nTicker symbol: {symbol}", query.text),
            None => query.text.clone(),
        };
        let aggregate = orchestrator.execute(&agent_query).await?;
        let narrative = aggregate.text();

        let target = query.display_currency.unwrap_or(self.display_currency);
        let price = match query.kind {
            QueryKind::News => PriceOutcome::unavailable(PRICE_NOT_REQUESTED),
            QueryKind::Analysis => self.price(&narrative, symbol.as_deref(), target).await,
        };

        let report = NormalizedReport {
            id: Uuid::new_v4(),
            schema_version: REPORT_SCHEMA_VERSION,
            query_id: query.id,
            query: query.text.clone(),
            symbol,
            generated_at: Utc::now(),
            sections: aggregate.sections(),
            partial: aggregate.is_partial(),
            gaps: aggregate.gaps,
            narrative,
            price_status: price.status,
            price_note: price.note,
            price_fields: price.fields,
            estimated_conversion: price.status == PriceStatus::Estimated,
            exchange_rate: price.rate,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            query_id = %query.id,
            price_status = ?report.price_status,
            partial = report.partial,
            elapsed_ms = report.processing_time_ms,
            "Query complete"
        );
        Ok(report)
    }

    async fn price(&self, narrative: &str, symbol: Option<&str>, target: Currency) -> PriceOutcome {
        let extracted = match self.extractor.extract(narrative, symbol) {
            Ok(Some(price)) => price,
            Ok(None) => {
                debug!("No price line in aggregated answers");
                return PriceOutcome::unavailable(NO_PRICE_MENTIONED);
            }
            Err(failure) => {
                warn!(line_number = failure.line_number, line = %failure.line, "Price extraction failed");
                return PriceOutcome::unavailable(&failure.to_string());
            }
        };

        let normalized = match self.normalizer.normalize(&extracted, target).await {
            Ok(normalized) => normalized,
            Err(overflow) => {
                warn!(error = %overflow, line = %extracted.source_line, "Price conversion failed");
                return PriceOutcome::unavailable(&overflow.to_string());
            }
        };
        let (status, note) = if normalized.estimated {
            (
                PriceStatus::Estimated,
                Some("live exchange rate unavailable, fallback rate used".to_string()),
            )
        } else {
            (PriceStatus::Present, None)
        };

        PriceOutcome {
            status,
            note,
            fields: normalized.fields,
            rate: normalized.rate,
        }
    }
}

struct PriceOutcome {
    status: PriceStatus,
    note: Option<String>,
    fields: Vec<PriceField>,
    rate: Option<AppliedRate>,
}

impl PriceOutcome {
    fn unavailable(note: &str) -> Self {
        Self {
            status: PriceStatus::Unavailable,
            note: Some(note.to_string()),
            fields: Vec::new(),
            rate: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use finagent_agents::test_support::MockAgent;
    use finagent_models::{ContextTransform, CurrencyConfig, RateOrigin};
    use finagent_pricing::RateError;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubRates {
        rate: Option<Decimal>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateProvider for StubRates {
        fn name(&self) -> &str {
            "stub"
        }

        async fn rate(&self, _base: Currency, _quote: Currency) -> Result<Decimal, RateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rate.ok_or(RateError::Status(503))
        }
    }

    fn stub(rate: Option<Decimal>) -> Arc<StubRates> {
        Arc::new(StubRates {
            rate,
            calls: AtomicUsize::new(0),
        })
    }

    fn plan(agents: Vec<Arc<MockAgent>>) -> Orchestrator {
        Orchestrator::new(
            OrchestrationPlan::new(
                agents
                    .into_iter()
                    .map(|a| PlanStep::new(a, ContextTransform::Concatenate))
                    .collect(),
            )
            .unwrap(),
        )
    }

    fn pipeline(
        web: Arc<MockAgent>,
        finance: Arc<MockAgent>,
        rates: Arc<StubRates>,
    ) -> Pipeline {
        Pipeline::new(
            plan(vec![web.clone(), finance]),
            Some(plan(vec![web])),
            PriceExtractor::default(),
            CurrencyNormalizer::new(rates, &CurrencyConfig::default()),
            Currency::Inr,
        )
    }

    #[tokio::test]
    async fn live_conversion_is_present() {
        let p = pipeline(
            MockAgent::answering("Web_Agent", "- NVDA rallies [Reuters]"),
            MockAgent::answering("Finance_Agent", "Current Price: 100.00"),
            stub(Some(dec!(83.0))),
        );

        let report = p.run(&Query::new("NVDA price").with_symbol("NVDA")).await.unwrap();
        assert_eq!(report.price_status, PriceStatus::Present);
        assert!(!report.estimated_conversion);
        assert_eq!(report.price_note, None);
        assert_eq!(report.price_fields[1].display, "₹8300.00");
        assert_eq!(report.exchange_rate.unwrap().origin, RateOrigin::Live);
        assert_eq!(report.symbol.as_deref(), Some("NVDA"));
        assert_eq!(report.sections.len(), 2);
    }

    #[tokio::test]
    async fn no_price_line_is_unavailable() {
        let p = pipeline(
            MockAgent::answering("Web_Agent", "- NVDA rallies"),
            MockAgent::answering("Finance_Agent", "- P/E 65"),
            stub(Some(dec!(83.0))),
        );

        let report = p.run(&Query::new("NVDA")).await.unwrap();
        assert_eq!(report.price_status, PriceStatus::Unavailable);
        assert_eq!(report.price_note.as_deref(), Some(NO_PRICE_MENTIONED));
        assert!(report.price_fields.is_empty());
    }

    #[tokio::test]
    async fn malformed_price_line_is_explained() {
        let p = pipeline(
            MockAgent::answering("Web_Agent", "- NVDA rallies"),
            MockAgent::answering("Finance_Agent", "Current Price: unavailable"),
            stub(Some(dec!(83.0))),
        );

        let report = p.run(&Query::new("NVDA")).await.unwrap();
        assert_eq!(report.price_status, PriceStatus::Unavailable);
        let note = report.price_note.unwrap();
        assert!(note.contains("Current Price: unavailable"));
    }

    #[tokio::test]
    async fn oversized_price_is_unavailable_not_a_crash() {
        let p = pipeline(
            MockAgent::answering("Web_Agent", "- NVDA rallies"),
            MockAgent::answering(
                "Finance_Agent",
                "Current Price: 1,000,000,000,000,000,000,000,000,000.5",
            ),
            stub(Some(dec!(83.0))),
        );

        let report = p.run(&Query::new("NVDA").with_symbol("NVDA")).await.unwrap();
        assert_eq!(report.price_status, PriceStatus::Unavailable);
        assert!(report.price_fields.is_empty());
        assert!(!report.estimated_conversion);
        assert!(report.price_note.unwrap().contains("overflows"));
        assert_eq!(report.sections.len(), 2);
    }

    #[tokio::test]
    async fn news_query_skips_finance_and_price() {
        let web = MockAgent::answering("Web_Agent", "- Current Price: 1.00 mentioned in passing");
        let finance = MockAgent::answering("Finance_Agent", "Current Price: 100.00");
        let rates = stub(Some(dec!(83.0)));
        let p = pipeline(web, finance.clone(), rates.clone());

        let report = p.run(&Query::news("NVDA headlines")).await.unwrap();
        assert_eq!(report.price_status, PriceStatus::Unavailable);
        assert_eq!(report.price_note.as_deref(), Some(PRICE_NOT_REQUESTED));
        assert_eq!(finance.runs().await, 0);
        assert_eq!(rates.calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.sections.len(), 1);
    }

    #[tokio::test]
    async fn assume_domestic_normalizes_symbol_and_skips_conversion() {
        let web = MockAgent::answering("Web_Agent", "- Infosys results [ET]");
        let finance = MockAgent::answering("Finance_Agent", "Stock Price: ₹1,502.35");
        let rates = stub(Some(dec!(0.012)));
        let p = pipeline(web.clone(), finance, rates.clone()).with_assume_domestic(true);

        let report = p
            .run(&Query::new("Infosys outlook").with_symbol("INFY").with_currency(Currency::Usd))
            .await
            .unwrap();
        assert_eq!(report.symbol.as_deref(), Some("INFY.NS"));
        assert_eq!(report.price_fields, vec![PriceField::new(Currency::Inr, dec!(1502.35))]);
        assert_eq!(rates.calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.query, "Infosys outlook");
    }

    #[tokio::test]
    async fn symbol_is_handed_to_agents() {
        let web = MockAgent::answering("Web_Agent", "- news");
        let finance = MockAgent::answering("Finance_Agent", "- fundamentals");
        let p = pipeline(web.clone(), finance.clone(), stub(None));

        let report = p
            .run(&Query::new("Summarize").with_symbol(" NVDA "))
            .await
            .unwrap();
        let expected = vec!["Summarize\n\nTicker symbol: NVDA".to_string()];
        assert_eq!(finance.queries().await, expected);
        assert_eq!(web.queries().await, expected);
        assert_eq!(report.query, "Summarize");
    }

    #[tokio::test]
    async fn orchestration_failure_propagates() {
        let p = pipeline(
            MockAgent::failing("Web_Agent", "down"),
            MockAgent::failing("Finance_Agent", "down"),
            stub(None),
        );

        let err = p.run(&Query::new("NVDA")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Orchestration(_)));
    }

    #[test]
    fn from_config_builds_both_plans() {
        let pipeline = Pipeline::from_config(&FinagentConfig::default()).unwrap();
        assert_eq!(
            pipeline.analysis.plan().agent_names(),
            vec!["Web_Agent", "Finance_Agent"]
        );
        assert_eq!(
            pipeline.news.as_ref().unwrap().plan().agent_names(),
            vec!["Web_Agent"]
        );
        assert!(!pipeline.assume_domestic);
    }
}
