//! Broker API (Driver Port)
//!
//! Account reads never fail: they fall back to defaults. Trading commands
//! return [`GatewayError`] so failed instructions are visible to the user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{AccountId, OrderId, PositionId};
use crate::domain::trading::{
    AccountMetainfo, AccountState, CanonicalOrder, CanonicalPosition, OrderStatus, PreOrder,
};
use crate::error::GatewayError;

/// Answer to `placeOrder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResult {
    /// Ledger-assigned id.
    pub order_id: OrderId,
    /// Status reported by the ledger.
    pub status: OrderStatus,
}

/// Answer to `modifyOrder`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyOrderResult {
    /// Order id.
    pub order_id: OrderId,
    /// Status after the command, `None` when the ledger has no such order.
    pub status: Option<OrderStatus>,
    /// False when the command was a no-op.
    pub modified: bool,
}

/// Trading broker.
#[async_trait]
pub trait BrokerApi: Send + Sync {
    /// Accounts available to the user.
    async fn accounts_metainfo(&self) -> Vec<AccountMetainfo>;

    /// Balance and margin summary.
    async fn account_state(&self, account_id: &AccountId) -> AccountState;

    /// Open positions.
    async fn positions(&self, account_id: &AccountId) -> Vec<CanonicalPosition>;

    /// Orders.
    async fn orders(&self, account_id: &AccountId) -> Vec<CanonicalOrder>;

    /// Place a new order.
    async fn place_order(
        &self,
        account_id: &AccountId,
        pre_order: PreOrder,
        parent_id: Option<OrderId>,
    ) -> Result<PlaceOrderResult, GatewayError>;

    /// Amend a working order.
    async fn modify_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        pre_order: PreOrder,
    ) -> Result<ModifyOrderResult, GatewayError>;

    /// Cancel an order.
    async fn cancel_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<bool, GatewayError>;

    /// Close an open position.
    async fn close_position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<bool, GatewayError>;

    /// Flip an open position to the opposite side at the same size.
    async fn reverse_position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<bool, GatewayError>;
}
