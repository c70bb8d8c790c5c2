//! In-memory paper ledger.
//!
//! Backs the gateway when no backend is configured. Market orders fill
//! immediately at the reference price the gateway attached; every other type
//! rests as a working order. Closing fills book their P&L into the account
//! balance.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::application::ports::{
    AccountRecord, OrderAmendment, OrderRecord, OrderSubmission, PositionRecord,
    RecordStorePort, StoreError,
};
use crate::domain::shared::{AccountId, OrderId, PositionId};
use crate::domain::trading::{CanonicalPosition, OrderSide, OrderStatus, OrderType};

#[derive(Debug, Default)]
struct Ledger {
    accounts: Vec<AccountRecord>,
    positions: Vec<PositionRecord>,
    orders: Vec<OrderRecord>,
}

impl Ledger {
    fn account_mut(&mut self, account_id: &AccountId) -> Result<&mut AccountRecord, StoreError> {
        self.accounts
            .iter_mut()
            .find(|a| a.id == account_id.as_str())
            .ok_or_else(|| StoreError::NotFound {
                entity: "Account".to_string(),
                id: account_id.to_string(),
            })
    }

    fn working_order_mut(
        &mut self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<&mut OrderRecord, StoreError> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == order_id.as_str() && o.account_id == account_id.as_str())
            .ok_or_else(|| StoreError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            })?;
        if OrderStatus::from_backend(&order.status).is_terminal() {
            return Err(StoreError::Rejected {
                message: format!("Order {order_id} is {}", order.status),
            });
        }
        Ok(order)
    }

    /// Reduce or remove a position with a fill, returning the booked P&L.
    fn close_against(&mut self, position_id: &PositionId, qty: Decimal, price: Decimal) -> Decimal {
        let Some(index) = self
            .positions
            .iter()
            .position(|p| p.id == position_id.as_str())
        else {
            return Decimal::ZERO;
        };
        let position = &mut self.positions[index];
        let closed = qty.min(position.quantity);
        let side = OrderSide::from_backend(&position.side);
        let pnl = CanonicalPosition::unrealized(side, closed, position.entry_price, price);

        position.quantity -= closed;
        position.realized_pnl = Some(position.realized_pnl.unwrap_or_default() + pnl);
        if position.quantity <= Decimal::ZERO {
            self.positions.remove(index);
        }
        pnl
    }
}

/// Paper trading ledger held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    ledger: RwLock<Ledger>,
    unavailable: AtomicBool,
}

impl InMemoryRecordStore {
    /// Ledger holding one funded demo account.
    #[must_use]
    pub fn with_account(account_id: &AccountId, name: &str, balance: Decimal) -> Self {
        let store = Self::default();
        store.ledger.write().accounts.push(AccountRecord {
            id: account_id.to_string(),
            name: Some(name.to_string()),
            currency: Some("USD".to_string()),
            balance,
            realized_pnl: Some(Decimal::ZERO),
            account_type: Some("demo".to_string()),
        });
        store
    }

    /// Make every call fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Seed an open position.
    pub fn add_position(&self, position: PositionRecord) {
        self.ledger.write().positions.push(position);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable {
                message: "paper ledger offline".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStorePort for InMemoryRecordStore {
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        self.check()?;
        Ok(self.ledger.read().accounts.clone())
    }

    async fn account(&self, account_id: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        self.check()?;
        Ok(self
            .ledger
            .read()
            .accounts
            .iter()
            .find(|a| a.id == account_id.as_str())
            .cloned())
    }

    async fn open_positions(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<PositionRecord>, StoreError> {
        self.check()?;
        Ok(self
            .ledger
            .read()
            .positions
            .iter()
            .filter(|p| p.account_id == account_id.as_str())
            .cloned()
            .collect())
    }

    async fn orders(&self, account_id: &AccountId) -> Result<Vec<OrderRecord>, StoreError> {
        self.check()?;
        Ok(self
            .ledger
            .read()
            .orders
            .iter()
            .filter(|o| o.account_id == account_id.as_str())
            .cloned()
            .collect())
    }

    async fn order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<Option<OrderRecord>, StoreError> {
        self.check()?;
        Ok(self
            .ledger
            .read()
            .orders
            .iter()
            .find(|o| o.id == order_id.as_str() && o.account_id == account_id.as_str())
            .cloned())
    }

    async fn position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<Option<PositionRecord>, StoreError> {
        self.check()?;
        Ok(self
            .ledger
            .read()
            .positions
            .iter()
            .find(|p| p.id == position_id.as_str() && p.account_id == account_id.as_str())
            .cloned())
    }

    async fn submit_order(&self, submission: &OrderSubmission) -> Result<OrderRecord, StoreError> {
        self.check()?;
        let now = Utc::now();
        let mut ledger = self.ledger.write();
        ledger.account_mut(&submission.account_id)?;

        let mut order = OrderRecord {
            id: OrderId::generate().to_string(),
            account_id: submission.account_id.to_string(),
            symbol: submission.symbol.to_string(),
            side: submission.side.as_backend().to_string(),
            order_type: submission.order_type.as_backend().to_string(),
            status: OrderStatus::Working.as_backend().to_string(),
            quantity: submission.qty,
            limit_price: submission.limit_price,
            stop_price: submission.stop_price,
            filled_quantity: Some(Decimal::ZERO),
            average_fill_price: None,
            parent_id: submission.parent_id.as_ref().map(ToString::to_string),
            created_at: Some(now),
            updated_at: Some(now),
        };

        if submission.order_type == OrderType::Market {
            let price = submission.reference_price;
            if price <= Decimal::ZERO {
                order.status = OrderStatus::Rejected.as_backend().to_string();
                tracing::info!(order_id = %order.id, "Paper order rejected: no price");
            } else {
                if let Some(position_id) = &submission.closes_position {
                    let pnl = ledger.close_against(position_id, submission.qty, price);
                    let account = ledger.account_mut(&submission.account_id)?;
                    account.balance += pnl;
                    account.realized_pnl = Some(account.realized_pnl.unwrap_or_default() + pnl);
                } else {
                    ledger.positions.push(PositionRecord {
                        id: PositionId::generate().to_string(),
                        account_id: submission.account_id.to_string(),
                        symbol: submission.symbol.to_string(),
                        side: submission.side.as_backend().to_string(),
                        quantity: submission.qty,
                        entry_price: price,
                        current_price: Some(price),
                        realized_pnl: None,
                        leverage: Some(submission.leverage),
                        stop_loss: submission.stop_loss,
                        take_profit: submission.take_profit,
                    });
                }
                order.status = OrderStatus::Filled.as_backend().to_string();
                order.filled_quantity = Some(submission.qty);
                order.average_fill_price = Some(price);
                tracing::info!(
                    order_id = %order.id,
                    symbol = %submission.symbol,
                    side = %submission.side,
                    qty = %submission.qty,
                    %price,
                    "Paper order filled"
                );
            }
        }

        ledger.orders.push(order.clone());
        Ok(order)
    }

    async fn amend_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        amendment: &OrderAmendment,
    ) -> Result<OrderRecord, StoreError> {
        self.check()?;
        let mut ledger = self.ledger.write();
        let order = ledger.working_order_mut(account_id, order_id)?;
        order.quantity = amendment.qty;
        order.limit_price = amendment.limit_price.or(order.limit_price);
        order.stop_price = amendment.stop_price.or(order.stop_price);
        order.updated_at = Some(Utc::now());
        Ok(order.clone())
    }

    async fn cancel_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<OrderRecord, StoreError> {
        self.check()?;
        let mut ledger = self.ledger.write();
        let order = ledger.working_order_mut(account_id, order_id)?;
        order.status = OrderStatus::Canceled.as_backend().to_string();
        order.updated_at = Some(Utc::now());
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::Symbol;
    use rust_decimal_macros::dec;

    fn account() -> AccountId {
        AccountId::new("demo")
    }

    fn submission(side: OrderSide, qty: Decimal, price: Decimal) -> OrderSubmission {
        OrderSubmission {
            account_id: account(),
            symbol: Symbol::new("AAPL"),
            side,
            order_type: OrderType::Market,
            qty,
            limit_price: None,
            stop_price: None,
            stop_loss: None,
            take_profit: None,
            leverage: Decimal::ONE,
            reference_price: price,
            parent_id: None,
            closes_position: None,
        }
    }

    #[tokio::test]
    async fn market_order_opens_position() {
        let store = InMemoryRecordStore::with_account(&account(), "Paper", dec!(10000));
        let order = store
            .submit_order(&submission(OrderSide::Buy, dec!(5), dec!(200)))
            .await
            .unwrap();

        assert_eq!(OrderStatus::from_backend(&order.status), OrderStatus::Filled);
        let positions = store.open_positions(&account()).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, dec!(5));
        assert_eq!(positions[0].entry_price, dec!(200));
    }

    #[tokio::test]
    async fn closing_fill_books_pnl() {
        let store = InMemoryRecordStore::with_account(&account(), "Paper", dec!(10000));
        store
            .submit_order(&submission(OrderSide::Buy, dec!(5), dec!(200)))
            .await
            .unwrap();
        let position_id = PositionId::new(&store.open_positions(&account()).await.unwrap()[0].id);

        let mut close = submission(OrderSide::Sell, dec!(5), dec!(210));
        close.closes_position = Some(position_id);
        store.submit_order(&close).await.unwrap();

        assert!(store.open_positions(&account()).await.unwrap().is_empty());
        let record = store.account(&account()).await.unwrap().unwrap();
        assert_eq!(record.balance, dec!(10050));
        assert_eq!(record.realized_pnl, Some(dec!(50)));
    }

    #[tokio::test]
    async fn limit_order_rests_and_cancels() {
        let store = InMemoryRecordStore::with_account(&account(), "Paper", dec!(10000));
        let mut ticket = submission(OrderSide::Buy, dec!(1), dec!(200));
        ticket.order_type = OrderType::Limit;
        ticket.limit_price = Some(dec!(190));
        let order = store.submit_order(&ticket).await.unwrap();
        assert_eq!(OrderStatus::from_backend(&order.status), OrderStatus::Working);

        let id = OrderId::new(&order.id);
        let canceled = store.cancel_order(&account(), &id).await.unwrap();
        assert_eq!(OrderStatus::from_backend(&canceled.status), OrderStatus::Canceled);

        let again = store.cancel_order(&account(), &id).await;
        assert!(matches!(again, Err(StoreError::Rejected { .. })));
    }

    #[tokio::test]
    async fn market_order_without_price_is_rejected() {
        let store = InMemoryRecordStore::with_account(&account(), "Paper", dec!(10000));
        let order = store
            .submit_order(&submission(OrderSide::Buy, dec!(1), Decimal::ZERO))
            .await
            .unwrap();
        assert_eq!(OrderStatus::from_backend(&order.status), OrderStatus::Rejected);
        assert!(store.open_positions(&account()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn outage_fails_every_call() {
        let store = InMemoryRecordStore::with_account(&account(), "Paper", dec!(10000));
        store.set_unavailable(true);
        assert!(matches!(
            store.list_accounts().await,
            Err(StoreError::Unavailable { .. })
        ));
        store.set_unavailable(false);
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
    }
}
