//! Ledger backed by the REST `user_accounts`, `user_wallets`, `positions` and
//! `orders` tables. All rows are scoped to the configured user.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use super::rest_client::{BackendClient, eq};
use super::rows::{NewOrderRow, OrderRow, PositionRow, UserAccountRow, WalletRow, account_record};
use crate::application::ports::{
    AccountRecord, OrderAmendment, OrderRecord, OrderSubmission, PositionRecord,
    RecordStorePort, StoreError,
};
use crate::domain::shared::{AccountId, OrderId, PositionId};
use crate::domain::trading::{OrderStatus, OrderType};

/// REST implementation of [`RecordStorePort`].
#[derive(Debug, Clone)]
pub struct RestRecordStore {
    client: BackendClient,
    user_id: String,
}

impl RestRecordStore {
    /// Store reading and writing rows of `user_id`.
    #[must_use]
    pub fn new(client: BackendClient, user_id: impl Into<String>) -> Self {
        Self {
            client,
            user_id: user_id.into(),
        }
    }

    async fn wallet(&self) -> Result<Option<WalletRow>, StoreError> {
        let rows: Vec<WalletRow> = self
            .client
            .select("user_wallets", &[eq("user_id", &self.user_id)])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn patch_order<P: Serialize + Sync>(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        patch: &P,
    ) -> Result<OrderRecord, StoreError> {
        let rows: Vec<OrderRow> = self
            .client
            .update(
                "orders",
                &[eq("id", order_id), eq("user_id", &self.user_id)],
                patch,
            )
            .await?;
        rows.into_iter()
            .next()
            .map(|row| row.into_record(account_id.as_str()))
            .ok_or_else(|| StoreError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            })
    }
}

#[async_trait]
impl RecordStorePort for RestRecordStore {
    async fn list_accounts(&self) -> Result<Vec<AccountRecord>, StoreError> {
        let accounts: Vec<UserAccountRow> = self
            .client
            .select("user_accounts", &[eq("user_id", &self.user_id)])
            .await?;
        let wallet = self.wallet().await?;
        Ok(accounts
            .into_iter()
            .map(|account| account_record(account, wallet.as_ref()))
            .collect())
    }

    async fn account(&self, account_id: &AccountId) -> Result<Option<AccountRecord>, StoreError> {
        let accounts: Vec<UserAccountRow> = self
            .client
            .select(
                "user_accounts",
                &[eq("id", account_id), eq("user_id", &self.user_id)],
            )
            .await?;
        let Some(account) = accounts.into_iter().next() else {
            return Ok(None);
        };
        let wallet = self.wallet().await?;
        Ok(Some(account_record(account, wallet.as_ref())))
    }

    async fn open_positions(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<PositionRecord>, StoreError> {
        let rows: Vec<PositionRow> = self
            .client
            .select(
                "positions",
                &[eq("user_id", &self.user_id), eq("status", "open")],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_record(account_id.as_str()))
            .collect())
    }

    async fn orders(&self, account_id: &AccountId) -> Result<Vec<OrderRecord>, StoreError> {
        let rows: Vec<OrderRow> = self
            .client
            .select(
                "orders",
                &[
                    eq("user_id", &self.user_id),
                    ("order", "created_at.asc".to_string()),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_record(account_id.as_str()))
            .collect())
    }

    async fn order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<Option<OrderRecord>, StoreError> {
        let rows: Vec<OrderRow> = self
            .client
            .select(
                "orders",
                &[eq("id", order_id), eq("user_id", &self.user_id)],
            )
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.into_record(account_id.as_str())))
    }

    async fn position(
        &self,
        account_id: &AccountId,
        position_id: &PositionId,
    ) -> Result<Option<PositionRecord>, StoreError> {
        let rows: Vec<PositionRow> = self
            .client
            .select(
                "positions",
                &[
                    eq("id", position_id),
                    eq("user_id", &self.user_id),
                    eq("status", "open"),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.into_record(account_id.as_str())))
    }

    async fn submit_order(&self, submission: &OrderSubmission) -> Result<OrderRecord, StoreError> {
        let status = if submission.order_type == OrderType::Market {
            OrderStatus::Pending
        } else {
            OrderStatus::Working
        };
        let row = NewOrderRow {
            user_id: &self.user_id,
            account_id: submission.account_id.as_str(),
            symbol: submission.symbol.as_str(),
            side: submission.side.as_backend(),
            order_type: submission.order_type.as_backend(),
            status: status.as_backend(),
            quantity: submission.qty,
            price: submission.limit_price,
            stop_price: submission.stop_price,
            stop_loss: submission.stop_loss,
            take_profit: submission.take_profit,
            leverage: submission.leverage,
            reference_price: submission.reference_price,
            parent_id: submission.parent_id.as_ref().map(OrderId::as_str),
            position_id: submission.closes_position.as_ref().map(PositionId::as_str),
        };

        let rows: Vec<OrderRow> = self.client.insert("orders", &row).await?;
        let record = rows
            .into_iter()
            .next()
            .map(|row| row.into_record(submission.account_id.as_str()))
            .ok_or_else(|| StoreError::Decode {
                message: "order insert returned no row".to_string(),
            })?;

        if let Some(position_id) = &submission.closes_position {
            let _: Vec<PositionRow> = self
                .client
                .update(
                    "positions",
                    &[eq("id", position_id), eq("user_id", &self.user_id)],
                    &json!({ "status": "closed", "updated_at": Utc::now() }),
                )
                .await?;
        }
        Ok(record)
    }

    async fn amend_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
        amendment: &OrderAmendment,
    ) -> Result<OrderRecord, StoreError> {
        let patch = json!({
            "quantity": amendment.qty,
            "price": amendment.limit_price,
            "stop_price": amendment.stop_price,
            "stop_loss": amendment.stop_loss,
            "take_profit": amendment.take_profit,
            "updated_at": Utc::now(),
        });
        self.patch_order(account_id, order_id, &patch).await
    }

    async fn cancel_order(
        &self,
        account_id: &AccountId,
        order_id: &OrderId,
    ) -> Result<OrderRecord, StoreError> {
        let patch = json!({
            "status": OrderStatus::Canceled.as_backend(),
            "updated_at": Utc::now(),
        });
        self.patch_order(account_id, order_id, &patch).await
    }
}
