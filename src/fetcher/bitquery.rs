//! Bitquery GraphQL OHLCV fetcher.
//!
//! Aggregates DEX trades of a base token against a quote token into fixed
//! time buckets. The GraphQL document is a fixed template; only the bucket
//! granularity is spliced in, and it comes from the typed [`Bucket`].
//! Addresses, network and row limit travel as GraphQL variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::Fetcher;
use crate::config::BitqueryConfig;
use crate::error::FetchError;
use crate::models::bitquery::OhlcvResponse;
use crate::models::candle::Candle;

/// Time unit of a provider bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketUnit {
    Minutes,
    Hours,
    Days,
}

impl BucketUnit {
    /// Returns the wire-format unit name expected by the Bitquery API.
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketUnit::Minutes => "minutes",
            BucketUnit::Hours => "hours",
            BucketUnit::Days => "days",
        }
    }
}

/// Bucket granularity, e.g. 5 minutes or 1 hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub unit: BucketUnit,
    pub count: u32,
}

impl Default for Bucket {
    fn default() -> Self {
        Self {
            unit: BucketUnit::Hours,
            count: 1,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.unit {
            BucketUnit::Minutes => 'm',
            BucketUnit::Hours => 'h',
            BucketUnit::Days => 'd',
        };
        write!(f, "{}{suffix}", self.count)
    }
}

impl FromStr for Bucket {
    type Err = String;

    /// Parses `<count><unit>` where unit is `m`, `h` or `d` (e.g. `5m`, `1h`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unit = match s.chars().last() {
            Some('m') => BucketUnit::Minutes,
            Some('h') => BucketUnit::Hours,
            Some('d') => BucketUnit::Days,
            _ => return Err(format!("invalid bucket {s:?}: expected suffix m, h or d")),
        };
        let count: u32 = s[..s.len() - 1]
            .parse()
            .map_err(|e| format!("invalid bucket {s:?}: {e}"))?;
        if count == 0 {
            return Err(format!("invalid bucket {s:?}: count must be positive"));
        }
        Ok(Self { unit, count })
    }
}

/// Fetches OHLCV buckets from the Bitquery streaming GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct BitqueryFetcher {
    client: reqwest::Client,
    url: String,
    token: String,
    network: String,
    quote_token: String,
    bucket: Bucket,
    timeout: Duration,
}

impl BitqueryFetcher {
    /// Builds a fetcher whose HTTP client enforces the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TallowError::Http`](crate::TallowError::Http) if the HTTP
    /// client cannot be constructed.
    pub fn new(config: &BitqueryConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
            network: config.network.clone(),
            quote_token: config.quote_token.clone(),
            bucket: config.bucket,
            timeout: config.fetch_timeout,
        })
    }

    /// Builds the JSON request body for `symbol` (the base token address).
    fn request_body(&self, symbol: &str, limit: usize) -> serde_json::Value {
        json!({
            "query": build_query(self.bucket),
            "variables": {
                "network": self.network,
                "base": symbol,
                "quote": self.quote_token,
                "limit": limit,
            }
        })
    }

    fn map_request_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Request(err)
        }
    }
}

#[async_trait]
impl Fetcher for BitqueryFetcher {
    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>, FetchError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&self.request_body(symbol, limit))
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;
        let candles = parse_ohlcv_response(&body)?;
        debug!(symbol, limit, candles = candles.len(), "Fetched OHLCV buckets");

        Ok(candles)
    }
}

/// Renders the GraphQL document for the given bucket granularity.
fn build_query(bucket: Bucket) -> String {
    format!(
        r#"query ($network: evm_network!, $base: String!, $quote: String!, $limit: Int!) {{
  EVM(network: $network, dataset: archive) {{
    DEXTradeByTokens(
      orderBy: {{descendingByField: "Block_bucket"}}
      where: {{Trade: {{Currency: {{SmartContract: {{is: $base}}}}, Side: {{Currency: {{SmartContract: {{is: $quote}}}}, Type: {{is: buy}}}}, PriceAsymmetry: {{lt: 0.1}}}}}}
      limit: {{count: $limit}}
    ) {{
      Block {{
        bucket: Time(interval: {{in: {unit}, count: {count}}})
      }}
      volume: sum(of: Trade_Amount)
      Trade {{
        high: Price(maximum: Trade_Price)
        low: Price(minimum: Trade_Price)
        open: Price(minimum: Block_Number)
        close: Price(maximum: Block_Number)
      }}
      count
    }}
  }}
}}"#,
        unit = bucket.unit.as_str(),
        count = bucket.count,
    )
}

/// Parses a raw Bitquery response body into candles.
///
/// # Errors
///
/// Returns [`FetchError::Provider`] if the body carries GraphQL errors and
/// [`FetchError::Malformed`] if it does not match the expected shape.
pub fn parse_ohlcv_response(body: &str) -> Result<Vec<Candle>, FetchError> {
    let response: OhlcvResponse = serde_json::from_str(body)?;

    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(FetchError::Provider(messages.join(", ")));
    }

    let data = response
        .data
        .ok_or_else(|| FetchError::Malformed("missing data in OHLCV response".into()))?;

    Ok(data.evm.buckets.into_iter().map(Candle::from).collect())
}
