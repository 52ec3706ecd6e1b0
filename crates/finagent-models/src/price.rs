use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currencies the pipeline can label and convert between.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Inr,
}

impl Currency {
    /// ISO 4217 code, as used by the rate source's `rates` map.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Inr => "INR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Inr => "₹",
        }
    }

    /// Render a value with the currency sign and two decimals, e.g. `$123.45`.
    pub fn format(&self, value: Decimal) -> String {
        format!("{}{:.2}", self.symbol(), value)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "INR" => Ok(Currency::Inr),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

/// Where a listing trades, inferred from the exchange suffix of its symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Domestic,
    Foreign,
}

/// A price parsed out of free-form agent text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedPrice {
    pub value: Decimal,
    pub currency: Currency,
    pub market: Market,
    /// The trimmed line the value was read from.
    pub source_line: String,
    /// 1-based line number within the scanned text.
    pub line_number: usize,
}

/// One currency-labelled price in the final report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceField {
    /// Display label, e.g. `Stock Price (INR)`.
    pub label: String,
    pub currency: Currency,
    pub value: Decimal,
    /// Rendered value, e.g. `₹10791.23`.
    pub display: String,
}

impl PriceField {
    pub fn new(currency: Currency, value: Decimal) -> Self {
        Self {
            label: format!("Stock Price ({})", currency.code()),
            currency,
            value,
            display: currency.format(value),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateOrigin {
    Live,
    Fallback,
}

/// The exchange rate used for a conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedRate {
    pub base: Currency,
    pub quote: Currency,
    /// Units of `quote` per one unit of `base`.
    pub rate: Decimal,
    pub origin: RateOrigin,
}
