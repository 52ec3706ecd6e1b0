use std::sync::LazyLock;

use finagent_models::{Currency, CurrencyConfig, ExtractedPrice, Market, SymbolConfig};
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::ExtractionFailure;
use crate::symbol::MarketClassifier;

/// Case-sensitive phrases that mark a live price line.
pub const PRICE_LABELS: [&str; 2] = ["Current Price", "Stock Price"];

/// ASCII digits with optional thousands separators, a decimal point, and a
/// fractional part.
static PRICE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9,]+\.[0-9]+").expect("price token pattern is valid"));

/// Finds the first price mention in agent text and attributes it to a market.
#[derive(Debug, Clone)]
pub struct PriceExtractor {
    classifier: MarketClassifier,
    domestic: Currency,
    foreign: Currency,
}

impl PriceExtractor {
    pub fn new(classifier: MarketClassifier, domestic: Currency, foreign: Currency) -> Self {
        Self {
            classifier,
            domestic,
            foreign,
        }
    }

    pub fn from_config(symbols: &SymbolConfig, currency: &CurrencyConfig) -> Self {
        Self::new(
            MarketClassifier::from_config(symbols),
            currency.domestic,
            currency.foreign,
        )
    }

    pub fn classifier(&self) -> &MarketClassifier {
        &self.classifier
    }

    /// Scan `text` line by line and parse the first line carrying a price label.
    ///
    /// Returns `Ok(None)` when no line carries a label. Only the first labelled
    /// line is considered; if it has no usable numeric token the result is an
    /// [`ExtractionFailure`] for that line, even if a later line would parse.
    pub fn extract(
        &self,
        text: &str,
        market_hint: Option<&str>,
    ) -> Result<Option<ExtractedPrice>, ExtractionFailure> {
        let Some((line_number, line)) = text
            .lines()
            .map(str::trim)
            .enumerate()
            .find(|(_, line)| PRICE_LABELS.iter().any(|label| line.contains(label)))
        else {
            return Ok(None);
        };
        let line_number = line_number + 1;

        let failure = || ExtractionFailure {
            line_number,
            line: line.to_string(),
        };

        let token = PRICE_TOKEN.find(line).ok_or_else(failure)?;
        let value =
            Decimal::from_str_exact(&token.as_str().replace(',', "")).map_err(|_| failure())?;

        let market = self.classifier.classify(market_hint);
        let currency = match market {
            Market::Domestic => self.domestic,
            Market::Foreign => self.foreign,
        };

        debug!(%value, ?market, line_number, "Extracted price");

        Ok(Some(ExtractedPrice {
            value,
            currency,
            market,
            source_line: line.to_string(),
            line_number,
        }))
    }
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::from_config(&SymbolConfig::default(), &CurrencyConfig::default())
    }
}
