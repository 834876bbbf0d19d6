//! OHLCV candle and per-symbol series models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single OHLCV bucket.
///
/// `timestamp` is the bucket start and the identity key within a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Number of underlying trades aggregated into this bucket.
    pub trade_count: u64,
}

/// Time-ordered candles for one tracked symbol.
///
/// Candles are strictly ascending by timestamp with no duplicates. Only the
/// store builds series, so readers always see a normalized sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    symbol: String,
    candles: Vec<Candle>,
}

impl Series {
    /// Wraps candles that are already sorted and deduplicated.
    pub(crate) fn from_sorted(symbol: String, candles: Vec<Candle>) -> Self {
        debug_assert!(
            candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp),
            "series candles must be strictly ascending"
        );
        Self { symbol, candles }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// All candles, oldest first.
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The most recent candle, if any.
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The newest `n` candles in chronological order (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(n);
        &self.candles[start..]
    }
}
