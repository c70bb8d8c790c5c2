//! Integration tests for the broker against the paper ledger.
//!
//! Fills are priced from market quotes the test stores in the last-quote
//! cache, which outrank the synthetic fallback.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use terminal_gateway::application::ports::BrokerApi;
use terminal_gateway::domain::trading::{OrderSide, OrderStatus, OrderType, PreOrder};
use terminal_gateway::{
    AccountId, Container, GatewayError, OrderId, PositionId, QuoteTick, Symbol,
    load_config_from_string,
};

const CONFIG: &str = r"
broker:
  account_id: paper-1
  default_balance: 10000
  snapshot_ttl_ms: 60000
";

fn gateway() -> Container {
    let config = load_config_from_string(CONFIG).unwrap();
    Container::from_config(&config).unwrap()
}

fn account() -> AccountId {
    AccountId::new("paper-1")
}

fn quote(gateway: &Container, bid: Decimal, ask: Decimal) {
    gateway.last_quotes().store(QuoteTick::new(
        Symbol::new("AAPL"),
        bid,
        ask,
        dec!(100),
        dec!(100),
        Utc::now(),
    ));
}

fn limit_buy(qty: Decimal, price: Decimal) -> PreOrder {
    PreOrder {
        order_type: OrderType::Limit,
        limit_price: Some(price),
        ..PreOrder::market(Symbol::new("AAPL"), OrderSide::Buy, qty)
    }
}

#[tokio::test]
async fn metainfo_lists_the_paper_account() {
    let gateway = gateway();
    let accounts = gateway.broker().accounts_metainfo().await;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, account());
    assert!(accounts[0].paper_trading);

    let state = gateway.broker().account_state(&account()).await;
    assert_eq!(state.balance, dec!(10000));
    assert_eq!(state.equity, dec!(10000));
    assert_eq!(state.used_margin, Decimal::ZERO);
}

#[tokio::test]
async fn market_buy_fills_at_the_ask() {
    let gateway = gateway();
    let broker = gateway.broker();
    quote(&gateway, dec!(99.9), dec!(100.1));

    let placed = broker
        .place_order(
            &account(),
            PreOrder::market(Symbol::new("AAPL"), OrderSide::Buy, dec!(10)),
            None,
        )
        .await
        .unwrap();
    assert_eq!(placed.status, OrderStatus::Filled);

    let positions = broker.positions(&account()).await;
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].side, OrderSide::Buy);
    assert_eq!(positions[0].qty, dec!(10));
    assert_eq!(positions[0].avg_open_price, dec!(100.1));

    let orders = broker.orders(&account()).await;
    assert!(orders.iter().any(|o| o.id == placed.order_id && o.filled_qty == dec!(10)));
}

#[tokio::test]
async fn closing_books_the_pnl() {
    let gateway = gateway();
    let broker = gateway.broker();
    quote(&gateway, dec!(99.9), dec!(100.1));
    broker
        .place_order(
            &account(),
            PreOrder::market(Symbol::new("AAPL"), OrderSide::Buy, dec!(10)),
            None,
        )
        .await
        .unwrap();
    let position_id = broker.positions(&account()).await[0].id.clone();

    quote(&gateway, dec!(110.9), dec!(111.1));
    let marked = broker.account_state(&account()).await;
    assert_eq!(marked.unrealized_pnl, dec!(109));

    assert!(broker.close_position(&account(), &position_id).await.unwrap());
    assert!(broker.positions(&account()).await.is_empty());

    let state = broker.account_state(&account()).await;
    assert_eq!(state.balance, dec!(10108));
    assert_eq!(state.realized_pnl, dec!(108));
    assert_eq!(state.unrealized_pnl, Decimal::ZERO);
}

#[tokio::test]
async fn reverse_flips_the_side_at_the_same_size() {
    let gateway = gateway();
    let broker = gateway.broker();
    quote(&gateway, dec!(99.9), dec!(100.1));
    broker
        .place_order(
            &account(),
            PreOrder::market(Symbol::new("AAPL"), OrderSide::Buy, dec!(3)),
            None,
        )
        .await
        .unwrap();
    let original = broker.positions(&account()).await.remove(0);

    assert!(broker.reverse_position(&account(), &original.id).await.unwrap());

    let positions = broker.positions(&account()).await;
    assert_eq!(positions.len(), 1);
    assert_ne!(positions[0].id, original.id);
    assert_eq!(positions[0].side, OrderSide::Sell);
    assert_eq!(positions[0].qty, dec!(3));
    assert_eq!(positions[0].avg_open_price, dec!(99.9));
}

#[tokio::test]
async fn unknown_position_is_not_found() {
    let gateway = gateway();
    let err = gateway
        .broker()
        .close_position(&account(), &PositionId::new("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound { .. }));
}

#[tokio::test]
async fn limit_order_rests_amends_and_cancels() {
    let gateway = gateway();
    let broker = gateway.broker();

    let placed = broker
        .place_order(&account(), limit_buy(dec!(5), dec!(90)), None)
        .await
        .unwrap();
    assert_eq!(placed.status, OrderStatus::Working);
    assert!(broker.positions(&account()).await.is_empty());

    let modified = broker
        .modify_order(&account(), &placed.order_id, limit_buy(dec!(7), dec!(91)))
        .await
        .unwrap();
    assert!(modified.modified);
    let order = broker
        .orders(&account())
        .await
        .into_iter()
        .find(|o| o.id == placed.order_id)
        .unwrap();
    assert_eq!(order.qty, dec!(7));
    assert_eq!(order.limit_price, Some(dec!(91)));

    assert!(broker.cancel_order(&account(), &placed.order_id).await.unwrap());
    assert!(broker.cancel_order(&account(), &placed.order_id).await.unwrap());

    let unchanged = broker
        .modify_order(&account(), &placed.order_id, limit_buy(dec!(9), dec!(92)))
        .await
        .unwrap();
    assert!(!unchanged.modified);
    assert_eq!(unchanged.status, Some(OrderStatus::Canceled));

    assert!(broker.cancel_order(&account(), &OrderId::new("missing")).await.unwrap());
}

#[tokio::test]
async fn invalid_tickets_never_reach_the_ledger() {
    let gateway = gateway();
    let broker = gateway.broker();

    let zero = PreOrder::market(Symbol::new("AAPL"), OrderSide::Buy, Decimal::ZERO);
    let err = broker.place_order(&account(), zero, None).await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation { .. }));

    let unknown = PreOrder::market(Symbol::new("NOPE"), OrderSide::Buy, dec!(1));
    let err = broker.place_order(&account(), unknown, None).await.unwrap_err();
    assert!(matches!(err, GatewayError::Validation { .. }));

    assert!(broker.orders(&account()).await.is_empty());
}

#[tokio::test]
async fn ledger_outage_degrades_reads_and_fails_writes() {
    let gateway = gateway();
    let broker = gateway.broker();
    gateway.paper_ledger().unwrap().set_unavailable(true);

    let accounts = broker.accounts_metainfo().await;
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id, account());
    assert_eq!(accounts[0].account_type, "demo");

    let state = broker.account_state(&account()).await;
    assert_eq!(state.balance, dec!(10000));
    assert_eq!(state.margin_level, dec!(100));
    assert!(broker.positions(&account()).await.is_empty());
    assert!(broker.orders(&account()).await.is_empty());

    quote(&gateway, dec!(99.9), dec!(100.1));
    let err = broker
        .place_order(
            &account(),
            PreOrder::market(Symbol::new("AAPL"), OrderSide::Buy, dec!(1)),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::UpstreamUnavailable { .. }));

    gateway.paper_ledger().unwrap().set_unavailable(false);
    let state = broker.account_state(&account()).await;
    assert_eq!(state.balance, dec!(10000));
}
