//! Shared test utilities.

#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tallow::FetchError;
use tallow::fetcher::Fetcher;
use tallow::models::candle::Candle;

/// Builds a candle at `secs` past the epoch with the given close.
pub fn candle(secs: i64, close: Decimal) -> Candle {
    Candle {
        timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        open: dec!(100),
        high: dec!(1000),
        low: dec!(1),
        close,
        volume: dec!(12.5),
        trade_count: 4,
    }
}

/// Timestamps (seconds) of every candle in a slice.
pub fn seconds(candles: &[Candle]) -> Vec<i64> {
    candles.iter().map(|c| c.timestamp.timestamp()).collect()
}

/// Replays a scripted list of responses and records requested limits.
///
/// Once the script runs out every call returns an empty batch.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<Vec<Candle>, FetchError>>>,
    limits: Mutex<Vec<usize>>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Result<Vec<Candle>, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            limits: Mutex::new(Vec::new()),
        }
    }

    /// Limits passed to each `fetch` call so far.
    pub fn limits(&self) -> Vec<usize> {
        self.limits.lock().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, _symbol: &str, limit: usize) -> Result<Vec<Candle>, FetchError> {
        self.limits.lock().push(limit);
        self.script.lock().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}
