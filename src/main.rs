use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tallow::TallowError;
use tallow::config::fetch_config;
use tallow::fetcher::bitquery::BitqueryFetcher;
use tallow::refresh::start_refresh;
use tallow::store::SeriesStore;

/// Cadences of the demo consumer loops.
const CONSUMER_INTERVALS: [Duration; 2] = [Duration::from_secs(60), Duration::from_secs(150)];

#[tokio::main]
async fn main() -> Result<(), TallowError> {
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let app_config = fetch_config()?;

    let store = Arc::new(match app_config.cache.max_candles {
        Some(max) => SeriesStore::with_retention(max),
        None => SeriesStore::new(),
    });
    let fetcher = Arc::new(BitqueryFetcher::new(&app_config.bitquery)?);
    let cancel = CancellationToken::new();

    let refresh = start_refresh(
        store.clone(),
        fetcher,
        app_config.symbol.clone(),
        app_config.refresh.clone(),
        cancel.clone(),
    );

    let consumers: Vec<_> = CONSUMER_INTERVALS
        .iter()
        .enumerate()
        .map(|(index, every)| {
            tokio::spawn(run_consumer(
                index,
                store.clone(),
                app_config.symbol.clone(),
                app_config.cache.compress_window,
                *every,
                cancel.clone(),
            ))
        })
        .collect();

    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
    cancel.cancel();

    let _ = refresh.await;
    for consumer in consumers {
        let _ = consumer.await;
    }

    Ok(())
}

/// Logs the compressed snapshot on its own timer until cancelled.
async fn run_consumer(
    index: usize,
    store: Arc<SeriesStore>,
    symbol: String,
    window: usize,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let digest = store.compressed_snapshot_with(&symbol, window);
                info!(consumer = index, %symbol, "Latest candles:\n{digest}");
            }
        }
    }
}
