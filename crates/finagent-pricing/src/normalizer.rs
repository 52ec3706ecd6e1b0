use std::sync::Arc;
use std::time::Duration;

use finagent_models::{
    AppliedRate, Currency, CurrencyConfig, ExtractedPrice, Market, PriceField, RateOrigin,
};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use crate::error::ConversionOverflow;
use crate::rates::{RateCache, RateProvider};

/// Price fields produced for one extracted price.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPrice {
    /// Original value first, converted value (if any) second.
    pub fields: Vec<PriceField>,
    pub rate: Option<AppliedRate>,
    /// True when the conversion used the fallback rate.
    pub estimated: bool,
}

/// Converts extracted prices into the display currency.
///
/// A failed live lookup never fails normalization: the configured fallback
/// rate is substituted and the result is flagged as estimated.
pub struct CurrencyNormalizer {
    provider: Arc<dyn RateProvider>,
    cache: RateCache,
    domestic: Currency,
    foreign: Currency,
    fallback_rate: Decimal,
}

impl CurrencyNormalizer {
    pub fn new(provider: Arc<dyn RateProvider>, config: &CurrencyConfig) -> Self {
        Self {
            provider,
            cache: RateCache::new(Duration::from_secs(config.rate_cache_ttl_seconds)),
            domestic: config.domestic,
            foreign: config.foreign,
            fallback_rate: config.fallback_rate,
        }
    }

    /// Fails only when the converted value is too large to represent.
    pub async fn normalize(
        &self,
        price: &ExtractedPrice,
        target: Currency,
    ) -> Result<NormalizedPrice, ConversionOverflow> {
        let original = PriceField::new(price.currency, price.value);

        if price.market == Market::Domestic || price.currency == target {
            return Ok(NormalizedPrice {
                fields: vec![original],
                rate: None,
                estimated: false,
            });
        }

        let rate = self.rate(price.currency, target).await;
        let converted = price
            .value
            .checked_mul(rate.rate)
            .ok_or(ConversionOverflow {
                value: price.value,
                from: price.currency,
                to: target,
                rate: rate.rate,
            })?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let estimated = rate.origin == RateOrigin::Fallback;

        Ok(NormalizedPrice {
            fields: vec![original, PriceField::new(target, converted)],
            rate: Some(rate),
            estimated,
        })
    }

    /// Live rate (cached) for the pair, or the fallback on any lookup failure.
    pub async fn rate(&self, base: Currency, quote: Currency) -> AppliedRate {
        if let Some(rate) = self.cache.get(base, quote).await {
            debug!(%base, %quote, %rate, "Rate cache hit");
            return AppliedRate {
                base,
                quote,
                rate,
                origin: RateOrigin::Live,
            };
        }

        match self.provider.rate(base, quote).await {
            Ok(rate) => {
                self.cache.insert(base, quote, rate).await;
                AppliedRate {
                    base,
                    quote,
                    rate,
                    origin: RateOrigin::Live,
                }
            }
            Err(e) => {
                let rate = self.fallback_for(base, quote);
                warn!(
                    provider = self.provider.name(),
                    %base,
                    %quote,
                    error = %e,
                    fallback = %rate,
                    "Live rate unavailable, using fallback"
                );
                AppliedRate {
                    base,
                    quote,
                    rate,
                    origin: RateOrigin::Fallback,
                }
            }
        }
    }

    /// The fallback is quoted as domestic units per foreign unit; the
    /// opposite direction uses its inverse.
    fn fallback_for(&self, base: Currency, quote: Currency) -> Decimal {
        if base == self.domestic && quote == self.foreign {
            (Decimal::ONE / self.fallback_rate).round_dp(6)
        } else {
            self.fallback_rate
        }
    }
}
