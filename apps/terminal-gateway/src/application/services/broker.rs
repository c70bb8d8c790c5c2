//! Broker facade: reads from the state adapter, commands through the gateway.

use async_trait::async_trait;
use std::sync::Arc;

use super::{BrokerStateAdapter, OrderCommandGateway};
use crate::application::ports::{BrokerApi, ModifyOrderResult, PlaceOrderResult};
use crate::domain::shared::{AccountId, OrderId, PositionId};
use crate::domain::trading::{
    AccountMetainfo, AccountState, CanonicalOrder, CanonicalPosition, PreOrder,
};
use crate::error::GatewayError;

/// [`BrokerApi`] implementation.
pub struct BrokerService {
    state: Arc<BrokerStateAdapter>,
    gateway: Arc<OrderCommandGateway>,
}

impl BrokerService {
    /// Wire the broker.
    #[must_use]
    pub const fn new(state: Arc<BrokerStateAdapter>, gateway: Arc<OrderCommandGateway>) -> Self {
        Self { state, gateway }
    }
}

#[async_trait]
impl BrokerApi for BrokerService {
    async fn accounts_metainfo(&self) -> Vec<AccountMetainfo> {
        self.state.accounts_metainfo().await
    }

    async fn account_state(&self, account_id: &AccountId) -> AccountState {
        self.state.account_state(account_id).await
    }

    async fn positions(&self, account_id: &AccountId) -> Vec<CanonicalPosition> {
        self.state.positions(account_id).await
    }

    async fn orders(&self, account_id: &AccountId) -> Vec<CanonicalOrder> {
        self.state.orders(account_id).await
    }

    async fn place_order(
        &self,
        account_id: &AccountId,
        pre_order: PreOrder,
        parent_id: Option<OrderId>,
    ) -> Result<PlaceOrderResult, GatewayError> {
        self.gateway
            .place_order(account_id, pre_order, parent_id)
            .await
    }

    async fn modify_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        pre_order: PreOrder,
    ) -> Result<ModifyOrderResult, GatewayError> {
        self.gateway
            .modify_order(account_id, order_id, pre_order)
            .await
    }

    async fn cancel_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<bool, GatewayError> {
        self.gateway.cancel_order(account_id, order_id).await
    }

    async fn close_position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<bool, GatewayError> {
        self.gateway.close_position(account_id, position_id).await
    }

    async fn reverse_position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<bool, GatewayError> {
        self.gateway.reverse_position(account_id, position_id).await
    }
}
