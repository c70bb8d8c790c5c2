//! Integration tests for the datafeed.
//!
//! These tests wire the paper gateway from configuration and drive the
//! datafeed the way the charting front-end does: search, resolve, history,
//! quote snapshots and realtime bar subscriptions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use terminal_gateway::application::ports::{
    DatafeedApi, DatafeedError, OnRealtimeBar, PeriodParams, QuoteSnapshot, QuoteStatus,
};
use terminal_gateway::{Bar, Config, Container, QuoteTick, Resolution, SubscriberId, Symbol};

fn paper_gateway() -> Container {
    Container::from_config(&Config::default()).unwrap()
}

fn counting_callback() -> (OnRealtimeBar, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let callback: OnRealtimeBar = Arc::new(move |_bar: Bar| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (callback, count)
}

#[tokio::test]
async fn search_and_resolve() {
    let gateway = paper_gateway();
    let datafeed = gateway.datafeed();

    let found = datafeed.search_symbols("btc", "", "crypto");
    assert!(found.iter().any(|d| d.symbol == "BTCUSD"));
    assert!(datafeed.search_symbols("btc", "", "bonds").is_empty());

    let info = datafeed.resolve_symbol("NASDAQ:aapl").unwrap();
    assert_eq!(info.ticker, "AAPL");
    assert_eq!(info.minmov, 1);

    let err = datafeed.resolve_symbol("NOPE").unwrap_err();
    assert!(matches!(err, DatafeedError::UnknownSymbol { .. }));
}

#[tokio::test]
async fn on_ready_lists_every_resolution() {
    let gateway = paper_gateway();
    let config = gateway.datafeed().on_ready().await;
    assert_eq!(config.supported_resolutions, Resolution::ALL.to_vec());
    assert!(config.supports_time);
    assert!(!config.exchanges.is_empty());
}

#[tokio::test]
async fn synthetic_history_is_capped_and_sorted() {
    let gateway = paper_gateway();
    let datafeed = gateway.datafeed();
    let info = datafeed.resolve_symbol("AAPL").unwrap();

    let to = Utc::now().timestamp();
    let period = PeriodParams {
        from: to - 365 * 24 * 3600,
        to,
        count_back: None,
    };
    let result = datafeed
        .get_bars(&info, Resolution::Minute1, period)
        .await
        .unwrap();

    assert!(!result.no_data);
    assert!(!result.bars.is_empty());
    assert!(result.bars.len() <= 500);
    assert!(result.bars.windows(2).all(|w| w[0].time < w[1].time));
    assert!(result.bars.iter().all(Bar::is_consistent));

    let again = datafeed
        .get_bars(&info, Resolution::Minute1, period)
        .await
        .unwrap();
    assert_eq!(result.bars, again.bars);
}

#[tokio::test]
async fn reversed_range_is_rejected() {
    let gateway = paper_gateway();
    let datafeed = gateway.datafeed();
    let info = datafeed.resolve_symbol("AAPL").unwrap();
    let period = PeriodParams {
        from: 2_000,
        to: 1_000,
        count_back: None,
    };
    let err = datafeed
        .get_bars(&info, Resolution::Day, period)
        .await
        .unwrap_err();
    assert_eq!(err, DatafeedError::InvalidRange { from: 2_000, to: 1_000 });
}

#[tokio::test]
async fn ranges_outside_the_calendar_are_rejected() {
    let gateway = paper_gateway();
    let datafeed = gateway.datafeed();
    let info = datafeed.resolve_symbol("AAPL").unwrap();

    for (from, to) in [(0, i64::MAX), (i64::MIN, 0), (i64::MIN, i64::MAX)] {
        let period = PeriodParams {
            from,
            to,
            count_back: None,
        };
        let err = datafeed
            .get_bars(&info, Resolution::Day, period)
            .await
            .unwrap_err();
        assert_eq!(err, DatafeedError::InvalidRange { from, to });
    }
}

#[tokio::test]
async fn count_back_extends_a_short_range() {
    let gateway = paper_gateway();
    let datafeed = gateway.datafeed();
    let info = datafeed.resolve_symbol("MSFT").unwrap();
    let to = 1_700_000_040;

    let period = PeriodParams {
        from: to - 120,
        to,
        count_back: Some(50),
    };
    let result = datafeed
        .get_bars(&info, Resolution::Minute1, period)
        .await
        .unwrap();
    assert!(result.bars.len() >= 50);

    let capped = PeriodParams {
        count_back: Some(10_000),
        ..period
    };
    let result = datafeed
        .get_bars(&info, Resolution::Minute1, capped)
        .await
        .unwrap();
    assert!(result.bars.len() <= 500);
    assert!(result.bars.len() >= 400);
}

#[tokio::test]
async fn quotes_report_unknown_symbols_per_entry() {
    let gateway = paper_gateway();
    let names = vec!["AAPL".to_string(), "NOPE".to_string(), "ETHUSD".to_string()];
    let snapshots = gateway.datafeed().get_quotes(&names).await;

    assert_eq!(snapshots.len(), 3);
    assert_eq!(snapshots[0].s, QuoteStatus::Ok);
    assert_eq!(snapshots[1].s, QuoteStatus::Error);
    assert!(snapshots[1].errmsg.as_deref().unwrap().contains("NOPE"));
    assert_eq!(snapshots[2].s, QuoteStatus::Ok);
    let values = snapshots[2].v.as_ref().unwrap();
    assert!(values.ask >= values.bid);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_stops_delivery() {
    let gateway = paper_gateway();
    let datafeed = gateway.datafeed();
    let info = datafeed.resolve_symbol("BTCUSD").unwrap();
    let (callback, count) = counting_callback();
    let id = SubscriberId::new("chart-1");

    datafeed
        .subscribe_bars(&info, Resolution::Minute1, callback, id.clone())
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(count.load(Ordering::SeqCst) > 0);

    datafeed.unsubscribe_bars(&id);
    let delivered = count.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(count.load(Ordering::SeqCst), delivered);
    assert_eq!(gateway.registry().bar_subscriptions(), 0);

    datafeed.unsubscribe_bars(&id);
    datafeed.unsubscribe_bars(&SubscriberId::new("never-subscribed"));
}

#[tokio::test(start_paused = true)]
async fn resubscribing_an_id_replaces_it() {
    let gateway = paper_gateway();
    let datafeed = gateway.datafeed();
    let info = datafeed.resolve_symbol("AAPL").unwrap();
    let id = SubscriberId::new("chart-1");

    let (first, first_count) = counting_callback();
    datafeed
        .subscribe_bars(&info, Resolution::Minute1, first, id.clone())
        .unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let (second, second_count) = counting_callback();
    datafeed
        .subscribe_bars(&info, Resolution::Minute5, second, id.clone())
        .unwrap();
    let frozen = first_count.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(gateway.registry().bar_subscriptions(), 1);
    assert_eq!(first_count.load(Ordering::SeqCst), frozen);
    assert!(second_count.load(Ordering::SeqCst) > 0);
}

#[tokio::test(start_paused = true)]
async fn pushed_prices_reach_bar_subscribers() {
    let gateway = paper_gateway();
    let datafeed = gateway.datafeed();
    let info = datafeed.resolve_symbol("AAPL").unwrap();

    let bars = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&bars);
    let callback: OnRealtimeBar = Arc::new(move |bar: Bar| sink.lock().push(bar));
    datafeed
        .subscribe_bars(&info, Resolution::Minute1, callback, SubscriberId::new("push"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let polled = bars.lock().len();

    let tick = QuoteTick::new(
        Symbol::new("AAPL"),
        dec!(100.9),
        dec!(101.1),
        dec!(10),
        dec!(10),
        Utc::now(),
    );
    assert_eq!(gateway.prices().publish(tick), 1);
    tokio::time::sleep(Duration::from_millis(10)).await;

    let delivered = bars.lock().clone();
    assert!(delivered.len() > polled);
    assert_eq!(delivered.last().unwrap().close, dec!(101));
    assert_eq!(
        gateway.last_quotes().mid(&Symbol::new("AAPL")),
        Some(dec!(101))
    );

    // Polling keeps running next to the push channel and now prices from
    // the pushed market quote instead of the synthetic fallback.
    tokio::time::sleep(Duration::from_secs(3)).await;
    let later = bars.lock().clone();
    assert!(later.len() > delivered.len());
    assert!(later[delivered.len()..].iter().all(|bar| bar.close == dec!(101)));
}

#[tokio::test(start_paused = true)]
async fn quote_listeners_receive_snapshots() {
    let gateway = paper_gateway();
    let datafeed = gateway.datafeed();
    let batches = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&batches);
    let id = SubscriberId::new("watchlist");

    datafeed.subscribe_quotes(
        &["AAPL".to_string()],
        &["AAPL".to_string(), "BTCUSD".to_string()],
        Arc::new(move |snapshots: Vec<QuoteSnapshot>| {
            assert_eq!(snapshots.len(), 2);
            seen.fetch_add(1, Ordering::SeqCst);
        }),
        id.clone(),
    );
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(batches.load(Ordering::SeqCst) > 0);

    datafeed.unsubscribe_quotes(&id);
    assert_eq!(gateway.registry().quote_subscriptions(), 0);
}
