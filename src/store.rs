//! Shared per-symbol candle store.
//!
//! [`SeriesStore`] owns every tracked [`Series`] behind a single
//! [`parking_lot::RwLock`]. Writers build the fully merged series off to the
//! side and swap it in as a new [`Arc`], so readers holding a snapshot keep a
//! stable, immutable view and never observe a half-applied merge.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::compress::{DEFAULT_COMPRESS_WINDOW, compress};
use crate::models::candle::{Candle, Series};

/// Process-wide cache of candle series keyed by symbol.
#[derive(Debug, Default)]
pub struct SeriesStore {
    series: RwLock<HashMap<String, Arc<Series>>>,
    /// Keep at most this many of the newest candles per series.
    max_candles: Option<usize>,
}

impl SeriesStore {
    /// Creates an empty store with unbounded series.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that evicts the oldest candles once a series
    /// grows past `max_candles`.
    #[must_use]
    pub fn with_retention(max_candles: usize) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            max_candles: Some(max_candles),
        }
    }

    /// Merges a freshly fetched batch into the series for `symbol`.
    ///
    /// Candles are keyed by timestamp. A batch candle whose timestamp already
    /// exists replaces the stored one, since the provider revises buckets as
    /// trades land. Stored candles absent from the batch are kept. The first
    /// merge for a symbol creates its series.
    pub fn merge(&self, symbol: &str, batch: Vec<Candle>) {
        let mut guard = self.series.write();
        let existing = guard.get(symbol).map(|s| s.candles()).unwrap_or_default();
        let batch_len = batch.len();

        let mut candles = merge_candles(existing, batch);
        if let Some(max) = self.max_candles
            && candles.len() > max
        {
            candles.drain(..candles.len() - max);
        }

        debug!(
            symbol,
            batch = batch_len,
            candles = candles.len(),
            "Merged candle batch"
        );
        guard.insert(
            symbol.to_string(),
            Arc::new(Series::from_sorted(symbol.to_string(), candles)),
        );
    }

    /// Returns the current series for `symbol`, or `None` if nothing has
    /// been merged for it yet.
    ///
    /// Only clones an [`Arc`] under a read lock; never waits on a fetch.
    pub fn snapshot(&self, symbol: &str) -> Option<Arc<Series>> {
        self.series.read().get(symbol).cloned()
    }

    /// Returns the compressed digest of the newest
    /// [`DEFAULT_COMPRESS_WINDOW`] candles for `symbol`.
    pub fn compressed_snapshot(&self, symbol: &str) -> String {
        self.compressed_snapshot_with(symbol, DEFAULT_COMPRESS_WINDOW)
    }

    /// Like [`compressed_snapshot`](Self::compressed_snapshot) with an explicit window.
    pub fn compressed_snapshot_with(&self, symbol: &str, window: usize) -> String {
        let snapshot = self.snapshot(symbol);
        compress(snapshot.as_deref(), window)
    }

    /// Symbols that have at least one merged batch, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.series.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

/// Builds the timestamp-keyed union of `existing` and `batch`.
///
/// Later entries win: batch over existing, and within the batch a later row
/// over an earlier one with the same timestamp.
fn merge_candles(existing: &[Candle], batch: Vec<Candle>) -> Vec<Candle> {
    let mut by_time: BTreeMap<DateTime<Utc>, Candle> = existing
        .iter()
        .map(|c| (c.timestamp, c.clone()))
        .collect();
    for candle in batch {
        by_time.insert(candle.timestamp, candle);
    }
    by_time.into_values().collect()
}
