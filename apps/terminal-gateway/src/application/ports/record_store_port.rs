//! Record Store Port (Driven Port)
//!
//! The trading ledger: accounts, positions and orders as the backend stores
//! them, plus the write endpoints commands are routed to. Rows carry the
//! ledger's own loosely-typed strings; normalization happens in the broker
//! state adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::shared::{AccountId, OrderId, PositionId, Symbol};
use crate::domain::trading::{OrderSide, OrderType};

/// Ledger failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The ledger could not be reached or answered with a server error.
    #[error("Ledger unavailable: {message}")]
    Unavailable {
        /// Error description.
        message: String,
    },

    /// The ledger refused the request.
    #[error("Ledger rejected request: {message}")]
    Rejected {
        /// Rejection reason.
        message: String,
    },

    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind.
        entity: String,
        /// Requested id.
        id: String,
    },

    /// A response could not be decoded.
    #[error("Malformed ledger response: {message}")]
    Decode {
        /// Error description.
        message: String,
    },
}

/// Account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Cash balance.
    pub balance: Decimal,
    /// Booked P&L, when the ledger tracks it.
    #[serde(default)]
    pub realized_pnl: Option<Decimal>,
    /// Account type (`demo`, `live`).
    #[serde(default)]
    pub account_type: Option<String>,
}

/// Open position row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Position id.
    pub id: String,
    /// Owning account.
    pub account_id: String,
    /// Instrument ticker.
    pub symbol: String,
    /// Side string (`buy`, `LONG`, ...).
    pub side: String,
    /// Open quantity.
    pub quantity: Decimal,
    /// Average entry price.
    pub entry_price: Decimal,
    /// Mark price stored by the ledger.
    #[serde(default)]
    pub current_price: Option<Decimal>,
    /// Booked P&L on partial closes.
    #[serde(default)]
    pub realized_pnl: Option<Decimal>,
    /// Leverage the position was opened with.
    #[serde(default)]
    pub leverage: Option<Decimal>,
    /// Protective stop.
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    /// Take-profit level.
    #[serde(default)]
    pub take_profit: Option<Decimal>,
}

/// Order row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Order id.
    pub id: String,
    /// Owning account.
    pub account_id: String,
    /// Instrument ticker.
    pub symbol: String,
    /// Side string.
    pub side: String,
    /// Type string.
    pub order_type: String,
    /// Status string.
    pub status: String,
    /// Ordered quantity.
    pub quantity: Decimal,
    /// Limit price.
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    /// Stop price.
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    /// Filled quantity.
    #[serde(default)]
    pub filled_quantity: Option<Decimal>,
    /// Average fill price.
    #[serde(default)]
    pub average_fill_price: Option<Decimal>,
    /// Parent order for bracket legs.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A new order routed to the ledger's place-order endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSubmission {
    /// Account placing the order.
    pub account_id: AccountId,
    /// Instrument.
    pub symbol: Symbol,
    /// Direction.
    pub side: OrderSide,
    /// Pricing type.
    pub order_type: OrderType,
    /// Quantity.
    pub qty: Decimal,
    /// Limit price.
    pub limit_price: Option<Decimal>,
    /// Stop price.
    pub stop_price: Option<Decimal>,
    /// Protective stop.
    pub stop_loss: Option<Decimal>,
    /// Take-profit level.
    pub take_profit: Option<Decimal>,
    /// Leverage.
    pub leverage: Decimal,
    /// Client-side execution reference price.
    pub reference_price: Decimal,
    /// Parent order for bracket legs.
    pub parent_id: Option<OrderId>,
    /// Position this order closes, if any.
    pub closes_position: Option<PositionId>,
}

/// Changes applied to a working order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderAmendment {
    /// New quantity.
    pub qty: Decimal,
    /// New limit price.
    pub limit_price: Option<Decimal>,
    /// New stop price.
    pub stop_price: Option<Decimal>,
    /// New protective stop.
    pub stop_loss: Option<Decimal>,
    /// New take-profit level.
    pub take_profit: Option<Decimal>,
}

/// Port for the trading ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStorePort: Send + Sync {
    /// Accounts visible to the configured user.
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, StoreError>;

    /// One account row.
    async fn account(&self, account_id: &AccountId) -> Result<Option<AccountRecord>, StoreError>;

    /// Open positions of an account.
    async fn open_positions(&self, account_id: &AccountId)
    -> Result<Vec<PositionRecord>, StoreError>;

    /// Orders of an account, oldest first.
    async fn orders(&self, account_id: &AccountId) -> Result<Vec<OrderRecord>, StoreError>;

    /// One order row.
    async fn order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<Option<OrderRecord>, StoreError>;

    /// One open position row.
    async fn position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<Option<PositionRecord>, StoreError>;

    /// Route a new order to the ledger.
    async fn submit_order(&self, submission: &OrderSubmission) -> Result<OrderRecord, StoreError>;

    /// Amend a working order.
    async fn amend_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        amendment: &OrderAmendment,
    ) -> Result<OrderRecord, StoreError>;

    /// Cancel a working order.
    async fn cancel_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<OrderRecord, StoreError>;
}
