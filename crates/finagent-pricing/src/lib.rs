pub mod error;
pub mod extractor;
pub mod normalizer;
pub mod rates;
pub mod symbol;

pub use error::{ConversionOverflow, ExtractionFailure, RateError};
pub use extractor::PriceExtractor;
pub use normalizer::{CurrencyNormalizer, NormalizedPrice};
pub use rates::{ExchangeRateApi, RateCache, RateProvider};
pub use symbol::MarketClassifier;
