//! Bitquery `DEXTradeByTokens` OHLCV response models.
//!
//! These types mirror the JSON shape produced by the query in
//! [`crate::fetcher::bitquery`]. Numeric aggregates arrive either as JSON
//! numbers or as strings depending on the field, so prices, volume and trade
//! counts go through lenient deserializers.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

use super::candle::Candle;

/// Top-level GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct OhlcvResponse {
    pub data: Option<OhlcvData>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// A query error reported by the provider.
#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct OhlcvData {
    #[serde(rename = "EVM")]
    pub evm: EvmData,
}

#[derive(Debug, Deserialize)]
pub struct EvmData {
    #[serde(rename = "DEXTradeByTokens")]
    pub buckets: Vec<DexTradeBucket>,
}

/// One aggregated time bucket as returned by the provider.
#[derive(Debug, Deserialize)]
pub struct DexTradeBucket {
    #[serde(rename = "Block")]
    pub block: BucketBlock,
    #[serde(rename = "Trade")]
    pub trade: BucketPrices,
    /// Sum of traded base amount; usually text-encoded.
    #[serde(deserialize_with = "de_decimal")]
    pub volume: Decimal,
    #[serde(deserialize_with = "de_u64")]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct BucketBlock {
    /// Bucket start time (RFC 3339, UTC).
    pub bucket: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BucketPrices {
    #[serde(deserialize_with = "de_decimal")]
    pub open: Decimal,
    #[serde(deserialize_with = "de_decimal")]
    pub high: Decimal,
    #[serde(deserialize_with = "de_decimal")]
    pub low: Decimal,
    #[serde(deserialize_with = "de_decimal")]
    pub close: Decimal,
}

impl From<DexTradeBucket> for Candle {
    fn from(bucket: DexTradeBucket) -> Self {
        Candle {
            timestamp: bucket.block.bucket,
            open: bucket.trade.open,
            high: bucket.trade.high,
            low: bucket.trade.low,
            close: bucket.trade.close,
            volume: bucket.volume,
            trade_count: bucket.count,
        }
    }
}

/// Parses plain or scientific decimal notation.
fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Accepts a JSON number or a numeric string.
fn de_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => {
            let raw = n.to_string();
            parse_decimal(&raw)
                .ok_or_else(|| de::Error::custom(format!("could not parse decimal from {raw}")))
        }
        Value::String(s) => parse_decimal(s.trim())
            .ok_or_else(|| de::Error::custom(format!("could not parse decimal from string: {s}"))),
        other => Err(de::Error::custom(format!(
            "expected number or string, got: {other}"
        ))),
    }
}

/// Accepts a non-negative JSON integer or an integer string.
fn de_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("expected unsigned integer, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| de::Error::custom(format!("could not parse count from {s:?}: {e}"))),
        other => Err(de::Error::custom(format!(
            "expected number or string, got: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bucket_json(volume: &str, count: &str) -> String {
        format!(
            r#"{{
                "Block": {{ "bucket": "2025-01-10T12:00:00Z" }},
                "Trade": {{ "open": 0.5, "high": "0.75", "low": 4.5e-1, "close": 0.6 }},
                "volume": {volume},
                "count": {count}
            }}"#
        )
    }

    #[test]
    fn accepts_text_and_numeric_aggregates() {
        let bucket: DexTradeBucket =
            serde_json::from_str(&bucket_json("\"1234.5\"", "\"17\"")).unwrap();
        let candle = Candle::from(bucket);

        assert_eq!(candle.timestamp.to_rfc3339(), "2025-01-10T12:00:00+00:00");
        assert_eq!(candle.open, dec!(0.5));
        assert_eq!(candle.high, dec!(0.75));
        assert_eq!(candle.low, dec!(0.45));
        assert_eq!(candle.close, dec!(0.6));
        assert_eq!(candle.volume, dec!(1234.5));
        assert_eq!(candle.trade_count, 17);
    }

    #[test]
    fn accepts_numeric_volume_and_count() {
        let bucket: DexTradeBucket = serde_json::from_str(&bucket_json("88", "4")).unwrap();
        assert_eq!(bucket.volume, dec!(88));
        assert_eq!(bucket.count, 4);
    }

    #[test]
    fn rejects_non_numeric_volume() {
        let result = serde_json::from_str::<DexTradeBucket>(&bucket_json("\"lots\"", "1"));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_negative_count() {
        let result = serde_json::from_str::<DexTradeBucket>(&bucket_json("1", "-3"));
        assert!(result.is_err());
    }

    #[test]
    fn parses_scientific_notation() {
        assert_eq!(parse_decimal("1.5e-5"), Some(dec!(0.000015)));
        assert_eq!(parse_decimal("42"), Some(dec!(42)));
        assert_eq!(parse_decimal("abc"), None);
    }
}
