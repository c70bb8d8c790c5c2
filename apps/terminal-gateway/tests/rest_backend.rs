//! Integration tests for the REST adapters.
//!
//! Each test stands up a `wiremock` server in place of the ledger backend or
//! a quote provider.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::json;
use terminal_gateway::application::ports::{
    BarRange, BarStorePort, OrderSubmission, QuoteSourceError, QuoteSourcePort, RecordStorePort,
    StoreError,
};
use terminal_gateway::domain::market_data::InstrumentClass;
use terminal_gateway::domain::trading::{OrderSide, OrderType};
use terminal_gateway::infrastructure::backend::{
    BackendClient, RestBarStore, RestRecordStore, RetryPolicy,
};
use terminal_gateway::infrastructure::quote_sources::{LiveQuoteSource, SnapshotQuoteSource};
use terminal_gateway::{AccountId, Instrument, InstrumentCatalog, OrderId, Resolution, Symbol};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn client(server: &MockServer) -> BackendClient {
    let retry = RetryPolicy {
        max_attempts: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        multiplier: 2.0,
    };
    BackendClient::new(&server.uri(), "secret", TIMEOUT, retry).unwrap()
}

fn instrument(symbol: &str) -> Instrument {
    InstrumentCatalog::builtin()
        .get(&Symbol::new(symbol))
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn accounts_merge_the_wallet() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_accounts"))
        .and(query_param("user_id", "eq.u-1"))
        .and(header("apikey", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "acc-1", "name": "Main", "account_type": "live" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_wallets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "balance": "2500.50", "realized_pnl": 12, "currency": "EUR" }
        ])))
        .mount(&server)
        .await;

    let store = RestRecordStore::new(client(&server), "u-1");
    let accounts = store.list_accounts().await.unwrap();

    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, "acc-1");
    assert_eq!(accounts[0].balance, dec!(2500.50));
    assert_eq!(accounts[0].realized_pnl, Some(dec!(12)));
    assert_eq!(accounts[0].currency.as_deref(), Some("EUR"));
}

#[tokio::test]
async fn transient_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/positions"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/positions"))
        .and(query_param("status", "eq.open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 9, "symbol": "AAPL", "side": "BUY", "quantity": 3, "average_price": "200.25" }
        ])))
        .mount(&server)
        .await;

    let store = RestRecordStore::new(client(&server), "u-1");
    let positions = assert_ok!(store.open_positions(&AccountId::new("acc-1")).await);

    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].id, "9");
    assert_eq!(positions[0].account_id, "acc-1");
    assert_eq!(positions[0].entry_price, dec!(200.25));
}

#[tokio::test]
async fn persistent_outage_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/orders"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let store = RestRecordStore::new(client(&server), "u-1");
    let err = assert_err!(store.orders(&AccountId::new("acc-1")).await);
    assert!(matches!(err, StoreError::Unavailable { .. }));
}

#[tokio::test]
async fn submitting_a_market_order_inserts_a_pending_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/orders"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({
            "user_id": "u-1",
            "account_id": "acc-1",
            "symbol": "AAPL",
            "status": "pending",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "ord-1",
            "symbol": "AAPL",
            "side": "BUY",
            "order_type": "market",
            "status": "pending",
            "quantity": 2
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let store = RestRecordStore::new(client(&server), "u-1");
    let submission = OrderSubmission {
        account_id: AccountId::new("acc-1"),
        symbol: Symbol::new("AAPL"),
        side: OrderSide::Buy,
        order_type: OrderType::Market,
        qty: dec!(2),
        limit_price: None,
        stop_price: None,
        stop_loss: None,
        take_profit: None,
        leverage: dec!(1),
        reference_price: dec!(250.1),
        parent_id: None,
        closes_position: None,
    };
    let record = store.submit_order(&submission).await.unwrap();

    assert_eq!(record.id, "ord-1");
    assert_eq!(record.account_id, "acc-1");
    assert_eq!(record.status, "pending");
}

#[tokio::test]
async fn cancelling_an_unknown_order_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/orders"))
        .and(query_param("id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = RestRecordStore::new(client(&server), "u-1");
    let err = store
        .cancel_order(&AccountId::new("acc-1"), &OrderId::new("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn stored_bars_resolve_the_instrument_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/instruments"))
        .and(query_param("symbol", "eq.AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 7 }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/market_candles"))
        .and(query_param("instrument_id", "eq.7"))
        .and(query_param("timeframe", "eq.1h"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "ts_open": "2024-01-02T10:00:00Z", "open": 1, "high": 3, "low": 1, "close": 2 },
            { "ts_open": "2024-01-02T11:00:00Z", "open": 2, "high": 4, "low": 2, "close": 3, "volume": 10 }
        ])))
        .mount(&server)
        .await;

    let store = RestBarStore::new(client(&server));
    let range = BarRange::new(1_704_153_600, 1_704_240_000);
    let bars = store
        .stored_bars(&Symbol::new("AAPL"), Resolution::Hour1, range, 500)
        .await
        .unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].time, 1_704_189_600);
    assert_eq!(bars[1].volume, dec!(10));

    let again = store
        .stored_bars(&Symbol::new("AAPL"), Resolution::Hour1, range, 500)
        .await
        .unwrap();
    assert_eq!(again, bars);
}

#[tokio::test]
async fn computed_bars_come_from_the_function() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/functions/v1/candles-engine"))
        .and(body_partial_json(json!({ "symbol": "AAPL", "interval": "1day" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candles": [
                { "datetime": "2024-01-02", "open": "10", "high": "12", "low": "9", "close": "11" }
            ]
        })))
        .mount(&server)
        .await;

    let store = RestBarStore::new(client(&server));
    let bars = store
        .compute_bars(
            &Symbol::new("AAPL"),
            Resolution::Day,
            BarRange::new(1_704_153_600, 1_704_412_800),
        )
        .await
        .unwrap();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].time, 1_704_153_600);
    assert_eq!(bars[0].close, dec!(11));
}

#[tokio::test]
async fn live_source_reads_the_last_quote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/last/stock/AAPL"))
        .and(query_param("apikey", "k"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "AAPL",
            "bid": 249.9,
            "ask": 250.1,
            "bsize": 3,
            "asize": 4,
            "timestamp": 1_704_189_600_000_i64
        })))
        .mount(&server)
        .await;

    let source =
        LiveQuoteSource::new(&server.uri(), "k", vec![InstrumentClass::Stock], TIMEOUT).unwrap();
    let aapl = instrument("AAPL");
    assert!(source.supports(&aapl));
    assert!(!source.supports(&instrument("BTCUSD")));

    let tick = source.fetch_quote(&aapl).await.unwrap();
    assert_eq!(tick.bid, dec!(249.9));
    assert_eq!(tick.ask, dec!(250.1));
    assert_eq!(tick.ask_size, dec!(4));
    assert_eq!(tick.timestamp.timestamp(), 1_704_189_600);
}

#[tokio::test]
async fn live_source_maps_throttling_and_gaps() {
    let server = MockServer::start().await;
    Mock::given(path("/last/stock/AAPL"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(path("/last/stock/MSFT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "symbol": "MSFT" })))
        .mount(&server)
        .await;

    let source =
        LiveQuoteSource::new(&server.uri(), "k", vec![InstrumentClass::Stock], TIMEOUT).unwrap();
    assert_eq!(
        source.fetch_quote(&instrument("AAPL")).await.unwrap_err(),
        QuoteSourceError::RateLimited
    );
    assert!(matches!(
        source.fetch_quote(&instrument("MSFT")).await.unwrap_err(),
        QuoteSourceError::Empty { .. }
    ));
}

#[tokio::test]
async fn snapshot_source_prices_a_batch_with_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/cryptocurrency/quotes/latest"))
        .and(header("X-CMC_PRO_API_KEY", "k"))
        .and(query_param("convert", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "BTC": { "quote": { "USD": { "price": 100_000 } } },
                "ETH": { "quote": { "USD": { "price": 4_000 } } }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = Arc::new(InstrumentCatalog::builtin());
    let source = SnapshotQuoteSource::new(
        &server.uri(),
        "k",
        "USD",
        vec![InstrumentClass::Crypto],
        catalog,
        Duration::from_secs(60),
        TIMEOUT,
    )
    .unwrap();

    let btc = source.fetch_quote(&instrument("BTCUSD")).await.unwrap();
    assert_eq!(btc.bid, dec!(99975));
    assert_eq!(btc.ask, dec!(100025));
    assert_eq!(btc.mid(), dec!(100000));

    let eth = source.fetch_quote(&instrument("ETHUSD")).await.unwrap();
    assert_eq!(eth.mid(), dec!(4000));
}
