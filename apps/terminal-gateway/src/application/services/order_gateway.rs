//! Order Command Gateway
//!
//! Validates trading commands, prices them from the quote multiplexer and
//! routes them to the ledger. Write paths surface ledger failures; cancel and
//! modify are idempotent against terminal or unknown orders.
//!
//! Reversing a position is two orders: a full close, then an opposite-side
//! market order of the same quantity, sent only after the close succeeded.

use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Instant;

use super::{BrokerStateAdapter, QuoteMultiplexer};
use crate::application::ports::{
    ModifyOrderResult, OrderAmendment, OrderSubmission, PlaceOrderResult, RecordStorePort,
    StoreError,
};
use crate::domain::market_data::Instrument;
use crate::domain::shared::{AccountId, OrderId, PositionId};
use crate::domain::trading::{
    CanonicalPosition, OrderSide, OrderStateMachine, OrderStatus, OrderType, PreOrder,
};
use crate::error::GatewayError;
use crate::observability::record_order_command;

/// What a command did, for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    Noop,
    Rejected,
}

impl Outcome {
    const fn label(self) -> &'static str {
        match self {
            Self::Applied => "ok",
            Self::Noop => "noop",
            Self::Rejected => "rejected",
        }
    }
}

fn observe<T>(
    command: &'static str,
    started: Instant,
    result: Result<(T, Outcome), GatewayError>,
) -> Result<T, GatewayError> {
    let latency = started.elapsed().as_secs_f64();
    match result {
        Ok((value, outcome)) => {
            record_order_command(command, outcome.label(), latency);
            Ok(value)
        }
        Err(e) => {
            tracing::warn!(command, error = %e, "Order command failed");
            record_order_command(command, "error", latency);
            Err(e)
        }
    }
}

/// Trading command router.
pub struct OrderCommandGateway {
    store: Arc<dyn RecordStorePort>,
    state: Arc<BrokerStateAdapter>,
    multiplexer: Arc<QuoteMultiplexer>,
}

impl OrderCommandGateway {
    /// Gateway writing to `store` and invalidating `state` after each command.
    #[must_use]
    pub const fn new(
        store: Arc<dyn RecordStorePort>,
        state: Arc<BrokerStateAdapter>,
        multiplexer: Arc<QuoteMultiplexer>,
    ) -> Self {
        Self {
            store,
            state,
            multiplexer,
        }
    }

    /// Validate, price and submit a new order.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad ticket or unknown symbol (nothing is sent),
    /// `UpstreamUnavailable` when the ledger fails.
    pub async fn place_order(
        &self,
        account_id: &AccountId,
        pre_order: PreOrder,
        parent_id: Option<OrderId>,
    ) -> Result<PlaceOrderResult, GatewayError> {
        let started = Instant::now();
        let result = self.place(account_id, pre_order, parent_id).await;
        observe("place", started, result)
    }

    /// Amend a working order. Unknown or terminal orders are left alone.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad ticket, `UpstreamUnavailable` when the ledger
    /// fails.
    pub async fn modify_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        pre_order: PreOrder,
    ) -> Result<ModifyOrderResult, GatewayError> {
        let started = Instant::now();
        let result = self.modify(account_id, order_id, pre_order).await;
        observe("modify", started, result)
    }

    /// Cancel an order. Unknown or terminal orders succeed without a ledger call.
    ///
    /// # Errors
    ///
    /// `UpstreamUnavailable` when the ledger fails.
    pub async fn cancel_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<bool, GatewayError> {
        let started = Instant::now();
        let result = self.cancel(account_id, order_id).await;
        observe("cancel", started, result)
    }

    /// Close an open position with an opposite-side market order.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown position, `UpstreamUnavailable` when the
    /// ledger fails.
    pub async fn close_position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<bool, GatewayError> {
        let started = Instant::now();
        let result = async {
            let position = self.open_position(account_id, position_id).await?;
            let closed = self.close(account_id, &position).await?;
            self.state.invalidate(account_id);
            Ok((closed, if closed { Outcome::Applied } else { Outcome::Rejected }))
        }
        .await;
        observe("close", started, result)
    }

    /// Flip an open position: close it, then open the opposite side at the
    /// same quantity.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown position, `UpstreamUnavailable` when the
    /// ledger fails on either leg.
    pub async fn reverse_position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<bool, GatewayError> {
        let started = Instant::now();
        let result = self.reverse(account_id, position_id).await;
        observe("reverse", started, result)
    }

    async fn place(
        &self,
        account_id: &AccountId,
        pre_order: PreOrder,
        parent_id: Option<OrderId>,
    ) -> Result<(PlaceOrderResult, Outcome), GatewayError> {
        pre_order.validate()?;
        let instrument = self
            .multiplexer
            .catalog()
            .get(&pre_order.symbol)
            .cloned()
            .ok_or_else(|| {
                GatewayError::validation("symbol", format!("Unknown symbol: {}", pre_order.symbol))
            })?;

        let reference_price = self
            .reference_price(&instrument, pre_order.side, pre_order.limit_price)
            .await;
        let submission = OrderSubmission {
            account_id: account_id.clone(),
            symbol: instrument.symbol.clone(),
            side: pre_order.side,
            order_type: pre_order.order_type,
            qty: pre_order.qty,
            limit_price: pre_order.limit_price,
            stop_price: pre_order.stop_price,
            stop_loss: pre_order.stop_loss,
            take_profit: pre_order.take_profit,
            leverage: pre_order.leverage.unwrap_or(instrument.default_leverage),
            reference_price,
            parent_id,
            closes_position: None,
        };

        let record = self.store.submit_order(&submission).await;
        self.state.invalidate(account_id);
        let record = record?;

        let status = OrderStatus::from_backend(&record.status);
        tracing::info!(
            account = %account_id,
            order_id = %record.id,
            symbol = %submission.symbol,
            side = %submission.side,
            qty = %submission.qty,
            reference_price = %reference_price,
            status = %status,
            "Order placed"
        );
        let outcome = if status == OrderStatus::Rejected {
            Outcome::Rejected
        } else {
            Outcome::Applied
        };
        Ok((
            PlaceOrderResult {
                order_id: OrderId::new(record.id),
                status,
            },
            outcome,
        ))
    }

    async fn modify(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        pre_order: PreOrder,
    ) -> Result<(ModifyOrderResult, Outcome), GatewayError> {
        pre_order.validate()?;

        let Some(order) = self.state.order(account_id, order_id).await? else {
            tracing::debug!(account = %account_id, order_id = %order_id, "Modify of unknown order ignored");
            return Ok((
                ModifyOrderResult {
                    order_id: order_id.clone(),
                    status: None,
                    modified: false,
                },
                Outcome::Noop,
            ));
        };
        if order.status.is_terminal() {
            tracing::debug!(order_id = %order_id, status = %order.status, "Modify of terminal order ignored");
            return Ok((
                ModifyOrderResult {
                    order_id: order_id.clone(),
                    status: Some(order.status),
                    modified: false,
                },
                Outcome::Noop,
            ));
        }

        let amendment = OrderAmendment {
            qty: pre_order.qty,
            limit_price: pre_order.limit_price,
            stop_price: pre_order.stop_price,
            stop_loss: pre_order.stop_loss,
            take_profit: pre_order.take_profit,
        };
        let record = self.store.amend_order(account_id, order_id, &amendment).await;
        self.state.invalidate(account_id);
        let record = match record {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => {
                return Ok((
                    ModifyOrderResult {
                        order_id: order_id.clone(),
                        status: None,
                        modified: false,
                    },
                    Outcome::Noop,
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let status = OrderStatus::from_backend(&record.status);
        tracing::info!(account = %account_id, order_id = %order_id, status = %status, "Order modified");
        Ok((
            ModifyOrderResult {
                order_id: order_id.clone(),
                status: Some(status),
                modified: true,
            },
            Outcome::Applied,
        ))
    }

    async fn cancel(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<(bool, Outcome), GatewayError> {
        let Some(order) = self.state.order(account_id, order_id).await? else {
            tracing::debug!(account = %account_id, order_id = %order_id, "Cancel of unknown order ignored");
            return Ok((true, Outcome::Noop));
        };
        if OrderStateMachine::validate_transition(order.status, OrderStatus::Canceled).is_err() {
            tracing::debug!(order_id = %order_id, status = %order.status, "Cancel of terminal order ignored");
            return Ok((true, Outcome::Noop));
        }

        let record = self.store.cancel_order(account_id, order_id).await;
        self.state.invalidate(account_id);
        let status = match record {
            Ok(record) => OrderStatus::from_backend(&record.status),
            Err(StoreError::NotFound { .. }) => return Ok((true, Outcome::Noop)),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(account = %account_id, order_id = %order_id, status = %status, "Order canceled");
        let done = status.is_terminal();
        Ok((done, if done { Outcome::Applied } else { Outcome::Rejected }))
    }

    async fn reverse(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<(bool, Outcome), GatewayError> {
        let position = self.open_position(account_id, position_id).await?;
        let closed = self.close(account_id, &position).await;
        self.state.invalidate(account_id);
        if !closed? {
            return Ok((false, Outcome::Rejected));
        }

        let Some(instrument) = self.multiplexer.catalog().get(&position.symbol).cloned() else {
            return Err(GatewayError::validation(
                "symbol",
                format!("Unknown symbol: {}", position.symbol),
            ));
        };
        let side = position.side.opposite();
        let submission = OrderSubmission {
            account_id: account_id.clone(),
            symbol: position.symbol.clone(),
            side,
            order_type: OrderType::Market,
            qty: position.qty,
            limit_price: None,
            stop_price: None,
            stop_loss: None,
            take_profit: None,
            leverage: position.leverage,
            reference_price: self.reference_price(&instrument, side, None).await,
            parent_id: None,
            closes_position: None,
        };
        let record = self.store.submit_order(&submission).await;
        self.state.invalidate(account_id);
        let status = OrderStatus::from_backend(&record?.status);

        tracing::info!(
            account = %account_id,
            position = %position_id,
            side = %side,
            qty = %position.qty,
            status = %status,
            "Position reversed"
        );
        let opened = status != OrderStatus::Rejected;
        Ok((opened, if opened { Outcome::Applied } else { Outcome::Rejected }))
    }

    async fn open_position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<CanonicalPosition, GatewayError> {
        self.state
            .position(account_id, position_id)
            .await?
            .ok_or_else(|| GatewayError::not_found("Position", position_id.as_str()))
    }

    /// Submit the closing order. True unless the ledger rejected it.
    async fn close(
        &self,
        account_id: &AccountId,
        position: &CanonicalPosition,
    ) -> Result<bool, GatewayError> {
        let side = position.side.opposite();
        let reference_price = match self.multiplexer.catalog().get(&position.symbol) {
            Some(instrument) => self.reference_price(instrument, side, None).await,
            None => position.current_price,
        };
        let submission = OrderSubmission {
            account_id: account_id.clone(),
            symbol: position.symbol.clone(),
            side,
            order_type: OrderType::Market,
            qty: position.qty,
            limit_price: None,
            stop_price: None,
            stop_loss: None,
            take_profit: None,
            leverage: position.leverage,
            reference_price,
            parent_id: None,
            closes_position: Some(position.id.clone()),
        };
        let record = self.store.submit_order(&submission).await?;
        let status = OrderStatus::from_backend(&record.status);
        tracing::info!(
            account = %account_id,
            position = %position.id,
            qty = %position.qty,
            status = %status,
            "Position close submitted"
        );
        Ok(status != OrderStatus::Rejected)
    }

    /// Ask for buys, bid for sells, then the limit price, then the seed price.
    async fn reference_price(
        &self,
        instrument: &Instrument,
        side: OrderSide,
        limit_price: Option<Decimal>,
    ) -> Decimal {
        match self.multiplexer.quote_for(instrument).await {
            Some(tick) => match side {
                OrderSide::Buy => tick.ask,
                OrderSide::Sell => tick.bid,
            },
            None => {
                tracing::warn!(symbol = %instrument.symbol, "No quote for order pricing");
                limit_price.unwrap_or(instrument.base_price)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockRecordStorePort, OrderRecord, PositionRecord};
    use crate::application::services::{BrokerSettings, LastQuoteCache};
    use crate::domain::market_data::InstrumentCatalog;
    use crate::domain::shared::Symbol;
    use mockall::predicate::always;
    use rust_decimal_macros::dec;

    fn gateway(store: MockRecordStorePort) -> OrderCommandGateway {
        let store: Arc<dyn RecordStorePort> = Arc::new(store);
        let catalog = Arc::new(InstrumentCatalog::builtin());
        let quotes = Arc::new(LastQuoteCache::new());
        let multiplexer = Arc::new(QuoteMultiplexer::new(Arc::clone(&catalog), Arc::clone(&quotes)));
        let state = Arc::new(BrokerStateAdapter::new(
            Arc::clone(&store),
            catalog,
            quotes,
            BrokerSettings::default(),
        ));
        OrderCommandGateway::new(store, state, multiplexer)
    }

    fn order_record(status: &str) -> OrderRecord {
        OrderRecord {
            id: "ord-1".to_string(),
            account_id: "acc-1".to_string(),
            symbol: "AAPL".to_string(),
            side: "buy".to_string(),
            order_type: "limit".to_string(),
            status: status.to_string(),
            quantity: dec!(10),
            limit_price: Some(dec!(240)),
            stop_price: None,
            filled_quantity: None,
            average_fill_price: None,
            parent_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn position_record() -> PositionRecord {
        PositionRecord {
            id: "pos-1".to_string(),
            account_id: "acc-1".to_string(),
            symbol: "AAPL".to_string(),
            side: "buy".to_string(),
            quantity: dec!(3),
            entry_price: dec!(200),
            current_price: None,
            realized_pnl: None,
            leverage: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    fn account() -> AccountId {
        AccountId::new("acc-1")
    }

    #[tokio::test]
    async fn zero_quantity_never_reaches_the_ledger() {
        let mut store = MockRecordStorePort::new();
        store.expect_submit_order().times(0);

        let err = gateway(store)
            .place_order(
                &account(),
                PreOrder::market(Symbol::new("AAPL"), OrderSide::Buy, Decimal::ZERO),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Validation { ref field, .. } if field == "qty"));
    }

    #[tokio::test]
    async fn unknown_symbol_is_a_validation_error() {
        let mut store = MockRecordStorePort::new();
        store.expect_submit_order().times(0);

        let err = gateway(store)
            .place_order(
                &account(),
                PreOrder::market(Symbol::new("NOPE"), OrderSide::Buy, dec!(1)),
                None,
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::validation("symbol", "Unknown symbol: NOPE")
        );
    }

    #[tokio::test]
    async fn place_without_quote_prices_from_limit() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_submit_order()
            .withf(|s| s.reference_price == dec!(240) && s.leverage == Decimal::ONE)
            .times(1)
            .returning(|_| Ok(order_record("new")));

        let result = gateway(store)
            .place_order(
                &account(),
                PreOrder::limit(Symbol::new("AAPL"), OrderSide::Buy, dec!(10), dec!(240)),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.order_id, OrderId::new("ord-1"));
        assert_eq!(result.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn ledger_failure_surfaces_on_place() {
        let mut store = MockRecordStorePort::new();
        store.expect_submit_order().returning(|_| {
            Err(StoreError::Unavailable {
                message: "503".to_string(),
            })
        });

        let err = gateway(store)
            .place_order(
                &account(),
                PreOrder::market(Symbol::new("AAPL"), OrderSide::Sell, dec!(1)),
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn cancel_of_filled_order_is_a_noop() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_order()
            .returning(|_, _| Ok(Some(order_record("filled"))));
        store.expect_cancel_order().times(0);

        let canceled = gateway(store)
            .cancel_order(&account(), &OrderId::new("ord-1"))
            .await
            .unwrap();

        assert!(canceled);
    }

    #[tokio::test]
    async fn cancel_of_unknown_order_is_a_noop() {
        let mut store = MockRecordStorePort::new();
        store.expect_order().returning(|_, _| Ok(None));
        store.expect_cancel_order().times(0);

        assert!(
            gateway(store)
                .cancel_order(&account(), &OrderId::new("ghost"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn cancel_of_working_order_hits_the_ledger() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_order()
            .returning(|_, _| Ok(Some(order_record("open"))));
        store
            .expect_cancel_order()
            .with(always(), always())
            .times(1)
            .returning(|_, _| Ok(order_record("cancelled")));

        assert!(
            gateway(store)
                .cancel_order(&account(), &OrderId::new("ord-1"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn modify_of_terminal_order_is_a_noop() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_order()
            .returning(|_, _| Ok(Some(order_record("rejected"))));
        store.expect_amend_order().times(0);

        let result = gateway(store)
            .modify_order(
                &account(),
                &OrderId::new("ord-1"),
                PreOrder::limit(Symbol::new("AAPL"), OrderSide::Buy, dec!(5), dec!(230)),
            )
            .await
            .unwrap();

        assert!(!result.modified);
        assert_eq!(result.status, Some(OrderStatus::Rejected));
    }

    #[tokio::test]
    async fn close_of_unknown_position_is_not_found() {
        let mut store = MockRecordStorePort::new();
        store.expect_position().returning(|_, _| Ok(None));
        store.expect_submit_order().times(0);

        let err = gateway(store)
            .close_position(&account(), &PositionId::new("pos-9"))
            .await
            .unwrap_err();

        assert_eq!(err, GatewayError::not_found("Position", "pos-9"));
    }

    #[tokio::test]
    async fn close_sends_opposite_market_order() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_position()
            .returning(|_, _| Ok(Some(position_record())));
        store
            .expect_submit_order()
            .withf(|s| {
                s.side == OrderSide::Sell
                    && s.qty == dec!(3)
                    && s.order_type == OrderType::Market
                    && s.closes_position == Some(PositionId::new("pos-1"))
            })
            .times(1)
            .returning(|_| Ok(order_record("filled")));

        assert!(
            gateway(store)
                .close_position(&account(), &PositionId::new("pos-1"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn rejected_close_skips_the_reversing_leg() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_position()
            .returning(|_, _| Ok(Some(position_record())));
        store
            .expect_submit_order()
            .times(1)
            .returning(|_| Ok(order_record("rejected")));

        assert!(
            !gateway(store)
                .reverse_position(&account(), &PositionId::new("pos-1"))
                .await
                .unwrap()
        );
    }
}
