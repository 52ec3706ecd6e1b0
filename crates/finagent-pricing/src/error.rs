use finagent_models::Currency;
use rust_decimal::Decimal;
use thiserror::Error;

/// A price-label line whose numeric token is missing or unparseable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed price on line {line_number}: {line}")]
pub struct ExtractionFailure {
    pub line_number: usize,
    pub line: String,
}

/// A converted value that does not fit in a `Decimal`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Converting {value} {from} to {to} at rate {rate} overflows")]
pub struct ConversionOverflow {
    pub value: Decimal,
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
}

#[derive(Error, Debug)]
pub enum RateError {
    #[error("Rate request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate source returned HTTP {0}")]
    Status(u16),

    #[error("Malformed rate response: {0}")]
    Malformed(String),

    #[error("Rate source has no rate for {0}")]
    MissingRate(String),
}
