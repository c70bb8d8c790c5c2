//! Broker State Adapter
//!
//! Loads ledger rows and normalizes them into canonical accounts, positions
//! and orders. Read paths never fail: a ledger outage yields a deterministic
//! default account and empty collections.
//!
//! The last snapshot per account is cached for `snapshot_ttl` and dropped on
//! every write command routed for that account.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::LastQuoteCache;
use crate::application::ports::{
    AccountRecord, OrderRecord, PositionRecord, RecordStorePort, StoreError,
};
use crate::domain::market_data::InstrumentCatalog;
use crate::domain::shared::{AccountId, OrderId, PositionId, Symbol};
use crate::domain::trading::{
    AccountMetainfo, AccountState, CanonicalOrder, CanonicalPosition, OrderSide, OrderStatus,
    OrderType,
};

/// Defaults and cache policy of the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Balance reported when the ledger cannot be read.
    pub default_balance: Decimal,
    /// Margin level reported while no margin is used.
    pub margin_level_sentinel: Decimal,
    /// How long a fetched snapshot is served from cache.
    pub snapshot_ttl: Duration,
    /// Leverage for positions of unknown instruments.
    pub default_leverage: Decimal,
    /// Id of the fallback account.
    pub default_account_id: AccountId,
    /// Display name of accounts without one.
    pub account_name: String,
    /// Broker display name.
    pub broker_name: String,
    /// Account currency.
    pub currency: String,
    /// Currency sign.
    pub currency_sign: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            default_balance: Decimal::from(100_000),
            margin_level_sentinel: Decimal::ONE_HUNDRED,
            snapshot_ttl: Duration::from_secs(2),
            default_leverage: Decimal::ONE,
            default_account_id: AccountId::new("demo"),
            account_name: "TradeArena Trading Account".to_string(),
            broker_name: "TradeArena".to_string(),
            currency: "USD".to_string(),
            currency_sign: "$".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

#[derive(Debug, Default)]
struct Snapshot {
    account: Option<Cached<AccountRecord>>,
    positions: Option<Cached<Vec<CanonicalPosition>>>,
    orders: Option<Cached<Vec<CanonicalOrder>>>,
}

fn fresh<T: Clone>(entry: Option<&Cached<T>>, ttl: Duration) -> Option<T> {
    entry
        .filter(|cached| cached.fetched_at.elapsed() < ttl)
        .map(|cached| cached.value.clone())
}

/// Normalizing, caching view of the ledger.
pub struct BrokerStateAdapter {
    store: Arc<dyn RecordStorePort>,
    catalog: Arc<InstrumentCatalog>,
    quotes: Arc<LastQuoteCache>,
    settings: BrokerSettings,
    snapshots: Mutex<HashMap<AccountId, Snapshot>>,
}

impl BrokerStateAdapter {
    /// Adapter over `store`, marking positions with `quotes`.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStorePort>,
        catalog: Arc<InstrumentCatalog>,
        quotes: Arc<LastQuoteCache>,
        settings: BrokerSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            quotes,
            settings,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Adapter settings.
    #[must_use]
    pub const fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Account descriptors. Falls back to one demo account.
    pub async fn accounts_metainfo(&self) -> Vec<AccountMetainfo> {
        match self.store.list_accounts().await {
            Ok(rows) if !rows.is_empty() => rows.iter().map(|row| self.metainfo(row)).collect(),
            Ok(_) => {
                tracing::warn!("Ledger lists no accounts, serving the default account");
                vec![self.default_metainfo()]
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list accounts, serving the default account");
                vec![self.default_metainfo()]
            }
        }
    }

    /// Balance and margin summary. Never fails.
    pub async fn account_state(&self, account_id: &AccountId) -> AccountState {
        let record = match self.account_record(account_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(account = %account_id, "Unknown account, serving default state");
                return self.fallback_state();
            }
            Err(e) => {
                tracing::warn!(account = %account_id, error = %e, "Failed to read account, serving default state");
                return self.fallback_state();
            }
        };

        let positions = match self.load_positions(account_id).await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::warn!(account = %account_id, error = %e, "Failed to read positions, serving default state");
                return self.fallback_state();
            }
        };

        let realized = record
            .realized_pnl
            .unwrap_or_else(|| positions.iter().map(|p| p.realized_pnl).sum());
        AccountState::compute(
            record.balance,
            realized,
            &positions,
            self.settings.margin_level_sentinel,
        )
    }

    /// Open positions. Empty on ledger failure.
    pub async fn positions(&self, account_id: &AccountId) -> Vec<CanonicalPosition> {
        self.load_positions(account_id).await.unwrap_or_else(|e| {
            tracing::warn!(account = %account_id, error = %e, "Failed to read positions");
            Vec::new()
        })
    }

    /// Orders. Empty on ledger failure.
    pub async fn orders(&self, account_id: &AccountId) -> Vec<CanonicalOrder> {
        self.load_orders(account_id).await.unwrap_or_else(|e| {
            tracing::warn!(account = %account_id, error = %e, "Failed to read orders");
            Vec::new()
        })
    }

    /// One order straight from the ledger, bypassing the cache.
    pub async fn order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<Option<CanonicalOrder>, StoreError> {
        Ok(self
            .store
            .order(account_id, order_id)
            .await?
            .as_ref()
            .map(normalize_order))
    }

    /// One open position straight from the ledger, bypassing the cache.
    pub async fn position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<Option<CanonicalPosition>, StoreError> {
        Ok(self
            .store
            .position(account_id, position_id)
            .await?
            .and_then(|row| self.normalize_position(&row)))
    }

    /// Drop the cached snapshot of an account.
    pub fn invalidate(&self, account_id: &AccountId) {
        if self.snapshots.lock().remove(account_id).is_some() {
            tracing::debug!(account = %account_id, "Broker snapshot invalidated");
        }
    }

    async fn account_record(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<AccountRecord>, StoreError> {
        let ttl = self.settings.snapshot_ttl;
        if let Some(record) = self
            .snapshots
            .lock()
            .get(account_id)
            .and_then(|s| fresh(s.account.as_ref(), ttl))
        {
            return Ok(Some(record));
        }

        let record = self.store.account(account_id).await?;
        if let Some(record) = &record {
            self.snapshots
                .lock()
                .entry(account_id.clone())
                .or_default()
                .account = Some(Cached {
                value: record.clone(),
                fetched_at: Instant::now(),
            });
        }
        Ok(record)
    }

    async fn load_positions(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<CanonicalPosition>, StoreError> {
        let ttl = self.settings.snapshot_ttl;
        let cached = self
            .snapshots
            .lock()
            .get(account_id)
            .and_then(|s| fresh(s.positions.as_ref(), ttl));

        let mut positions = match cached {
            Some(positions) => positions,
            None => {
                let rows = self.store.open_positions(account_id).await?;
                let positions: Vec<CanonicalPosition> = rows
                    .iter()
                    .filter_map(|row| self.normalize_position(row))
                    .collect();
                self.snapshots
                    .lock()
                    .entry(account_id.clone())
                    .or_default()
                    .positions = Some(Cached {
                    value: positions.clone(),
                    fetched_at: Instant::now(),
                });
                positions
            }
        };

        // Cached positions still follow the latest quotes.
        for position in &mut positions {
            if let Some(mid) = self.quotes.mid(&position.symbol) {
                position.mark(mid);
            }
        }
        Ok(positions)
    }

    async fn load_orders(&self, account_id: &AccountId) -> Result<Vec<CanonicalOrder>, StoreError> {
        let ttl = self.settings.snapshot_ttl;
        if let Some(orders) = self
            .snapshots
            .lock()
            .get(account_id)
            .and_then(|s| fresh(s.orders.as_ref(), ttl))
        {
            return Ok(orders);
        }

        let orders: Vec<CanonicalOrder> = self
            .store
            .orders(account_id)
            .await?
            .iter()
            .map(normalize_order)
            .collect();
        self.snapshots
            .lock()
            .entry(account_id.clone())
            .or_default()
            .orders = Some(Cached {
            value: orders.clone(),
            fetched_at: Instant::now(),
        });
        Ok(orders)
    }

    fn normalize_position(&self, row: &PositionRecord) -> Option<CanonicalPosition> {
        if row.quantity.is_zero() {
            tracing::debug!(position = %row.id, "Skipping flat position row");
            return None;
        }

        let symbol = Symbol::new(&row.symbol);
        let instrument = self.catalog.get(&symbol);
        let side = if row.quantity < Decimal::ZERO {
            OrderSide::Sell
        } else {
            OrderSide::from_backend(&row.side)
        };
        let leverage = row
            .leverage
            .filter(|l| *l > Decimal::ZERO)
            .or_else(|| instrument.map(|i| i.default_leverage))
            .unwrap_or(self.settings.default_leverage);

        let mut position = CanonicalPosition {
            id: PositionId::new(&row.id),
            symbol: symbol.clone(),
            side,
            qty: row.quantity.abs(),
            avg_open_price: row.entry_price,
            current_price: row.entry_price,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: row.realized_pnl.unwrap_or_default(),
            contract_size: instrument.map_or(Decimal::ONE, |i| i.contract_size),
            leverage,
        };
        let current = self
            .quotes
            .mid(&symbol)
            .or(row.current_price)
            .unwrap_or(row.entry_price);
        position.mark(current);
        Some(position)
    }

    fn metainfo(&self, row: &AccountRecord) -> AccountMetainfo {
        let account_type = row.account_type.clone().unwrap_or_else(|| "demo".to_string());
        AccountMetainfo {
            id: AccountId::new(&row.id),
            name: row
                .name
                .clone()
                .unwrap_or_else(|| self.settings.account_name.clone()),
            currency: row
                .currency
                .clone()
                .unwrap_or_else(|| self.settings.currency.clone()),
            currency_sign: self.settings.currency_sign.clone(),
            broker_name: self.settings.broker_name.clone(),
            paper_trading: account_type != "live",
            account_type,
        }
    }

    fn default_metainfo(&self) -> AccountMetainfo {
        AccountMetainfo {
            id: self.settings.default_account_id.clone(),
            name: self.settings.account_name.clone(),
            currency: self.settings.currency.clone(),
            currency_sign: self.settings.currency_sign.clone(),
            broker_name: self.settings.broker_name.clone(),
            account_type: "demo".to_string(),
            paper_trading: true,
        }
    }

    fn fallback_state(&self) -> AccountState {
        AccountState::fallback(
            self.settings.default_balance,
            self.settings.margin_level_sentinel,
        )
    }
}

/// Map a ledger order row onto the canonical order.
#[must_use]
pub fn normalize_order(row: &OrderRecord) -> CanonicalOrder {
    let status = OrderStatus::from_backend(&row.status);
    let qty = row.quantity.abs();
    let filled_qty = row.filled_quantity.map_or_else(
        || {
            if status == OrderStatus::Filled {
                qty
            } else {
                Decimal::ZERO
            }
        },
        |filled| filled.abs(),
    );
    let created_at = row.created_at.unwrap_or_default();

    CanonicalOrder {
        id: OrderId::new(&row.id),
        symbol: Symbol::new(&row.symbol),
        side: OrderSide::from_backend(&row.side),
        qty,
        order_type: OrderType::from_backend(&row.order_type),
        status,
        limit_price: row.limit_price,
        stop_price: row.stop_price,
        filled_qty,
        avg_fill_price: row.average_fill_price.unwrap_or_default(),
        parent_id: row.parent_id.as_deref().map(OrderId::new),
        created_at,
        updated_at: row.updated_at.unwrap_or(created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockRecordStorePort;
    use chrono::Utc;
    use crate::domain::market_data::QuoteTick;
    use rust_decimal_macros::dec;

    fn account_row(balance: Decimal) -> AccountRecord {
        AccountRecord {
            id: "acc-1".to_string(),
            name: Some("Main".to_string()),
            currency: None,
            balance,
            realized_pnl: None,
            account_type: None,
        }
    }

    fn position_row(symbol: &str, side: &str, qty: Decimal, entry: Decimal) -> PositionRecord {
        PositionRecord {
            id: format!("pos-{symbol}"),
            account_id: "acc-1".to_string(),
            symbol: symbol.to_string(),
            side: side.to_string(),
            quantity: qty,
            entry_price: entry,
            current_price: None,
            realized_pnl: None,
            leverage: None,
            stop_loss: None,
            take_profit: None,
        }
    }

    fn order_row(status: &str) -> OrderRecord {
        OrderRecord {
            id: "ord-1".to_string(),
            account_id: "acc-1".to_string(),
            symbol: "aapl".to_string(),
            side: "SELL".to_string(),
            order_type: "LIMIT".to_string(),
            status: status.to_string(),
            quantity: dec!(-5),
            limit_price: Some(dec!(250)),
            stop_price: None,
            filled_quantity: None,
            average_fill_price: None,
            parent_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn adapter(store: MockRecordStorePort) -> BrokerStateAdapter {
        adapter_with_quotes(store, Arc::new(LastQuoteCache::new()))
    }

    fn adapter_with_quotes(
        store: MockRecordStorePort,
        quotes: Arc<LastQuoteCache>,
    ) -> BrokerStateAdapter {
        BrokerStateAdapter::new(
            Arc::new(store),
            Arc::new(InstrumentCatalog::builtin()),
            quotes,
            BrokerSettings::default(),
        )
    }

    fn outage() -> StoreError {
        StoreError::Unavailable {
            message: "connection refused".to_string(),
        }
    }

    #[tokio::test]
    async fn account_state_falls_back_on_outage() {
        let mut store = MockRecordStorePort::new();
        store.expect_account().returning(|_| Err(outage()));

        let state = adapter(store).account_state(&AccountId::new("acc-1")).await;

        assert_eq!(state.balance, dec!(100000));
        assert_eq!(state.equity, state.balance);
        assert_eq!(state.used_margin, Decimal::ZERO);
        assert_eq!(state.margin_level, dec!(100));
    }

    #[tokio::test]
    async fn account_state_falls_back_when_positions_fail() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_account()
            .returning(|_| Ok(Some(account_row(dec!(5000)))));
        store.expect_open_positions().returning(|_| Err(outage()));

        let state = adapter(store).account_state(&AccountId::new("acc-1")).await;

        assert_eq!(state.balance, dec!(100000));
    }

    #[tokio::test]
    async fn account_state_derives_margin_and_pnl() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_account()
            .returning(|_| Ok(Some(account_row(dec!(10000)))));
        store.expect_open_positions().returning(|_| {
            let mut long = position_row("AAPL", "buy", dec!(10), dec!(100));
            long.current_price = Some(dec!(110));
            long.realized_pnl = Some(dec!(7));
            let mut short = position_row("MSFT", "sell", dec!(5), dec!(200));
            short.current_price = Some(dec!(210));
            Ok(vec![long, short])
        });

        let state = adapter(store).account_state(&AccountId::new("acc-1")).await;

        assert_eq!(state.unrealized_pnl, dec!(50));
        assert_eq!(state.equity, dec!(10050));
        assert_eq!(state.used_margin, dec!(15));
        assert_eq!(state.free_margin, dec!(10035));
        assert_eq!(state.realized_pnl, dec!(7));
    }

    #[tokio::test]
    async fn positions_are_empty_on_outage() {
        let mut store = MockRecordStorePort::new();
        store.expect_open_positions().returning(|_| Err(outage()));

        assert!(adapter(store).positions(&AccountId::new("acc-1")).await.is_empty());
    }

    #[tokio::test]
    async fn negative_quantity_reads_as_short() {
        let mut store = MockRecordStorePort::new();
        store.expect_open_positions().returning(|_| {
            Ok(vec![
                position_row("EURUSD", "buy", dec!(-0.5), dec!(1.08)),
                position_row("AAPL", "buy", Decimal::ZERO, dec!(100)),
            ])
        });

        let positions = adapter(store).positions(&AccountId::new("acc-1")).await;

        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].side, OrderSide::Sell);
        assert_eq!(positions[0].qty, dec!(0.5));
        assert_eq!(positions[0].contract_size, dec!(100000));
        assert_eq!(positions[0].leverage, dec!(100));
    }

    #[tokio::test]
    async fn positions_are_marked_with_last_quote() {
        let quotes = Arc::new(LastQuoteCache::new());
        quotes.store(QuoteTick::new(
            Symbol::new("AAPL"),
            dec!(119),
            dec!(121),
            Decimal::ONE,
            Decimal::ONE,
            Utc::now(),
        ));
        let mut store = MockRecordStorePort::new();
        store.expect_open_positions().returning(|_| {
            let mut row = position_row("AAPL", "long", dec!(2), dec!(100));
            row.current_price = Some(dec!(105));
            Ok(vec![row])
        });

        let positions = adapter_with_quotes(store, quotes)
            .positions(&AccountId::new("acc-1"))
            .await;

        assert_eq!(positions[0].current_price, dec!(120));
        assert_eq!(positions[0].unrealized_pnl, dec!(40));
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_is_cached_until_invalidated() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_orders()
            .times(2)
            .returning(|_| Ok(vec![order_row("open")]));
        let adapter = adapter(store);
        let account = AccountId::new("acc-1");

        assert_eq!(adapter.orders(&account).await.len(), 1);
        assert_eq!(adapter.orders(&account).await.len(), 1);

        adapter.invalidate(&account);
        assert_eq!(adapter.orders(&account).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_expires_after_ttl() {
        let mut store = MockRecordStorePort::new();
        store
            .expect_orders()
            .times(2)
            .returning(|_| Ok(vec![order_row("filled")]));
        let adapter = adapter(store);
        let account = AccountId::new("acc-1");

        adapter.orders(&account).await;
        tokio::time::advance(Duration::from_secs(3)).await;
        adapter.orders(&account).await;
    }

    #[tokio::test]
    async fn metainfo_falls_back_to_demo_account() {
        let mut store = MockRecordStorePort::new();
        store.expect_list_accounts().returning(|| Err(outage()));

        let accounts = adapter(store).accounts_metainfo().await;

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, AccountId::new("demo"));
        assert_eq!(accounts[0].currency, "USD");
        assert!(accounts[0].paper_trading);
    }

    #[test]
    fn order_rows_normalize() {
        let order = normalize_order(&order_row("PARTIALLY_FILLED"));
        assert_eq!(order.symbol, Symbol::new("AAPL"));
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.qty, dec!(5));
        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.status, OrderStatus::Partial);
        assert_eq!(order.filled_qty, Decimal::ZERO);

        let filled = normalize_order(&order_row("executed"));
        assert_eq!(filled.status, OrderStatus::Filled);
        assert_eq!(filled.filled_qty, dec!(5));

        let odd = normalize_order(&order_row("held_for_review"));
        assert_eq!(odd.status, OrderStatus::Working);
    }
}
