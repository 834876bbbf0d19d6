//! Background refresh loop for one tracked symbol.
//!
//! [`RefreshLoop`] cycles `Idle → Fetching → Merging → Sleeping → Fetching …`
//! until its [`CancellationToken`] fires. The first fetch asks for a large
//! warm-up window; once a non-empty batch has landed, later fetches ask only
//! for a small incremental window and rely on the store's merge to
//! deduplicate overlapping buckets. Fetch failures and timeouts are logged
//! and the loop carries on after the normal sleep; the cached series is left
//! untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::store::SeriesStore;

/// Timing and window sizes for a refresh loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Sleep between iterations, regardless of outcome.
    pub interval: Duration,
    /// Rows requested before any candle has been cached.
    pub initial_limit: usize,
    /// Rows requested once the series is warm.
    pub incremental_limit: usize,
    /// Upper bound on a single fetch round trip.
    pub fetch_timeout: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            initial_limit: 100,
            incremental_limit: 10,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Where the loop currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Fetching,
    Merging,
    Sleeping,
}

/// Result of a single fetch-and-merge step.
#[derive(Debug)]
pub enum TickOutcome {
    /// A non-empty batch was merged into the store.
    Merged {
        candles: usize,
        newest: DateTime<Utc>,
    },
    /// The provider answered with no rows; nothing was merged.
    Empty,
    /// The fetch failed or timed out; the store was not touched.
    Failed(FetchError),
}

/// Keeps one symbol's entry in a [`SeriesStore`] fresh.
pub struct RefreshLoop {
    store: Arc<SeriesStore>,
    fetcher: Arc<dyn Fetcher>,
    symbol: String,
    settings: RefreshSettings,
    /// Newest bucket seen so far; only decides warm-up vs incremental size.
    last_known: Option<DateTime<Utc>>,
    state: RefreshState,
}

impl RefreshLoop {
    #[must_use]
    pub fn new(
        store: Arc<SeriesStore>,
        fetcher: Arc<dyn Fetcher>,
        symbol: impl Into<String>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            symbol: symbol.into(),
            settings,
            last_known: None,
            state: RefreshState::Idle,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    /// Timestamp of the newest candle from any successful fetch so far.
    pub fn last_known_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_known
    }

    /// Row limit the next fetch will request.
    pub fn next_limit(&self) -> usize {
        if self.last_known.is_some() {
            self.settings.incremental_limit
        } else {
            self.settings.initial_limit
        }
    }

    /// Runs exactly one fetch-and-merge step.
    pub async fn tick(&mut self) -> TickOutcome {
        let limit = self.next_limit();
        self.state = RefreshState::Fetching;
        debug!(symbol = %self.symbol, limit, "Fetching candles");

        let fetched = match tokio::time::timeout(
            self.settings.fetch_timeout,
            self.fetcher.fetch(&self.symbol, limit),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.settings.fetch_timeout)),
        };

        let candles = match fetched {
            Ok(candles) => candles,
            Err(error) => {
                warn!(
                    symbol = %self.symbol,
                    malformed = error.is_malformed(),
                    %error,
                    "Candle fetch failed, keeping cached series"
                );
                return TickOutcome::Failed(error);
            }
        };

        let Some(newest) = candles.iter().map(|c| c.timestamp).max() else {
            debug!(symbol = %self.symbol, "Provider returned no candles");
            return TickOutcome::Empty;
        };

        self.state = RefreshState::Merging;
        let count = candles.len();
        self.store.merge(&self.symbol, candles);
        self.last_known = Some(self.last_known.map_or(newest, |prev| prev.max(newest)));
        info!(
            symbol = %self.symbol,
            candles = count,
            newest = %newest,
            "Merged fetched candles"
        );

        TickOutcome::Merged {
            candles: count,
            newest,
        }
    }

    /// Runs the loop until `cancel` fires.
    ///
    /// Cancellation is observed while waiting on a fetch or during the
    /// sleep; a merge that has started always completes.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            symbol = %self.symbol,
            interval_secs = self.settings.interval.as_secs(),
            "Starting refresh loop"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = self.tick() => {}
            }

            self.state = RefreshState::Sleeping;
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        self.state = RefreshState::Idle;
        info!(symbol = %self.symbol, "Refresh loop stopped");
    }
}

/// Spawns a [`RefreshLoop`] for `symbol` on the current tokio runtime.
///
/// The loop runs until `cancel` is cancelled; await the returned handle to
/// wait for it to wind down.
pub fn start_refresh(
    store: Arc<SeriesStore>,
    fetcher: Arc<dyn Fetcher>,
    symbol: impl Into<String>,
    settings: RefreshSettings,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let refresh = RefreshLoop::new(store, fetcher, symbol, settings);
    tokio::spawn(refresh.run(cancel))
}
