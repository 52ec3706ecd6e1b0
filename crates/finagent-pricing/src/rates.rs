use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use finagent_models::Currency;
use moka::future::Cache;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::error::RateError;

/// A source of live exchange rates. Mockable for testing.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Units of `quote` per one unit of `base`.
    async fn rate(&self, base: Currency, quote: Currency) -> Result<Decimal, RateError>;
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    rates: serde_json::Map<String, serde_json::Value>,
}

/// Client for exchangerate-api style endpoints: `GET {base_url}/{BASE}`
/// answering `{"rates": {"INR": 83.12, ...}}`.
pub struct ExchangeRateApi {
    client: Client,
    base_url: String,
}

impl ExchangeRateApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RateError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RateProvider for ExchangeRateApi {
    fn name(&self) -> &str {
        "exchangerate-api"
    }

    async fn rate(&self, base: Currency, quote: Currency) -> Result<Decimal, RateError> {
        let url = format!("{}/{}", self.base_url, base.code());
        debug!(%url, "Fetching exchange rates");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(RateError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let latest: LatestRates =
            serde_json::from_str(&body).map_err(|e| RateError::Malformed(e.to_string()))?;

        let value = latest
            .rates
            .get(quote.code())
            .ok_or_else(|| RateError::MissingRate(quote.code().to_string()))?;

        let rate = match value {
            serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            serde_json::Value::String(s) => Decimal::from_str(s).ok(),
            _ => None,
        }
        .filter(|r| r.is_sign_positive() && !r.is_zero())
        .ok_or_else(|| RateError::Malformed(format!("{} rate: {value}", quote.code())))?;

        Ok(rate)
    }
}

/// In-memory cache of live rates, keyed by currency pair.
///
/// Entries are automatically evicted after TTL. Only live rates go in here.
pub struct RateCache {
    inner: Cache<(Currency, Currency), Decimal>,
}

impl RateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().max_capacity(64).time_to_live(ttl).build(),
        }
    }

    pub async fn get(&self, base: Currency, quote: Currency) -> Option<Decimal> {
        self.inner.get(&(base, quote)).await
    }

    pub async fn insert(&self, base: Currency, quote: Currency, rate: Decimal) {
        self.inner.insert((base, quote), rate).await;
    }
}
