//! Refresh loop behaviour against a scripted fetcher.

mod common;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use tallow::FetchError;
use tallow::refresh::{RefreshLoop, RefreshSettings, TickOutcome, start_refresh};
use tallow::store::SeriesStore;

use common::{ScriptedFetcher, candle, seconds};

fn settings() -> RefreshSettings {
    RefreshSettings {
        interval: Duration::from_secs(300),
        initial_limit: 100,
        incremental_limit: 10,
        fetch_timeout: Duration::from_secs(30),
    }
}

#[tokio::test]
async fn test_failed_fetch_leaves_store_untouched() {
    let store = Arc::new(SeriesStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        Ok(vec![candle(60, dec!(1)), candle(120, dec!(2))]),
        Err(FetchError::Status { status: 503 }),
        Err(FetchError::Malformed("missing Trade".into())),
    ]));
    let mut refresh = RefreshLoop::new(store.clone(), fetcher.clone(), "BTC", settings());

    assert!(matches!(refresh.tick().await, TickOutcome::Merged { candles: 2, .. }));
    let before = store.snapshot("BTC").unwrap();

    assert!(matches!(
        refresh.tick().await,
        TickOutcome::Failed(FetchError::Status { status: 503 })
    ));
    assert!(matches!(refresh.tick().await, TickOutcome::Failed(e) if e.is_malformed()));

    assert_eq!(*store.snapshot("BTC").unwrap(), *before);
    assert_eq!(fetcher.limits(), vec![100, 10, 10]);
}

#[tokio::test]
async fn test_empty_and_failed_fetches_stay_cold() {
    let store = Arc::new(SeriesStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        Ok(Vec::new()),
        Err(FetchError::Provider("rate limited".into())),
        Ok(vec![candle(60, dec!(1))]),
    ]));
    let mut refresh = RefreshLoop::new(store.clone(), fetcher.clone(), "BTC", settings());

    assert!(matches!(refresh.tick().await, TickOutcome::Empty));
    assert!(store.snapshot("BTC").is_none());
    assert!(matches!(refresh.tick().await, TickOutcome::Failed(_)));
    assert!(refresh.last_known_timestamp().is_none());

    assert!(matches!(refresh.tick().await, TickOutcome::Merged { .. }));
    assert_eq!(fetcher.limits(), vec![100, 100, 100]);
    assert_eq!(refresh.next_limit(), 10);
}

#[tokio::test]
async fn test_newest_timestamp_ignores_batch_order() {
    let store = Arc::new(SeriesStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![
        candle(180, dec!(3)),
        candle(60, dec!(1)),
        candle(120, dec!(2)),
    ])]));
    let mut refresh = RefreshLoop::new(store, fetcher, "BTC", settings());

    match refresh.tick().await {
        TickOutcome::Merged { candles, newest } => {
            assert_eq!(candles, 3);
            assert_eq!(newest.timestamp(), 180);
        }
        other => panic!("expected merge, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_loop_survives_failure_and_keeps_polling() {
    let store = Arc::new(SeriesStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        Ok(vec![candle(60, dec!(1)), candle(120, dec!(2))]),
        Err(FetchError::Status { status: 500 }),
        Ok(vec![candle(120, dec!(2.5)), candle(180, dec!(3))]),
    ]));
    let cancel = CancellationToken::new();

    let handle = start_refresh(
        store.clone(),
        fetcher.clone(),
        "BTC",
        settings(),
        cancel.clone(),
    );

    // Iterations run at t = 0, 300 and 600 on the paused clock.
    tokio::time::sleep(Duration::from_secs(601)).await;

    let series = store.snapshot("BTC").expect("series after three iterations");
    assert_eq!(seconds(series.candles()), vec![60, 120, 180]);
    assert_eq!(series.candles()[1].close, dec!(2.5));
    assert_eq!(fetcher.limits(), vec![100, 10, 10]);

    cancel.cancel();
    handle.await.expect("refresh task panicked");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_sleep_stops_loop() {
    let store = Arc::new(SeriesStore::new());
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(vec![candle(60, dec!(1))])]));
    let cancel = CancellationToken::new();

    let handle = start_refresh(store.clone(), fetcher.clone(), "BTC", settings(), cancel.clone());

    tokio::time::sleep(Duration::from_secs(10)).await;
    cancel.cancel();
    handle.await.expect("refresh task panicked");

    assert_eq!(fetcher.limits(), vec![100]);
    assert_eq!(store.snapshot("BTC").unwrap().len(), 1);
}
