//! Account state and account descriptors.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CanonicalPosition;
use crate::domain::shared::AccountId;

/// Balance and margin summary of one account.
///
/// Always satisfies `equity = balance + unrealizedPnl` and
/// `freeMargin = equity - usedMargin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    /// Cash balance as stored by the ledger.
    pub balance: Decimal,
    /// Balance plus open P&L.
    pub equity: Decimal,
    /// Booked P&L.
    pub realized_pnl: Decimal,
    /// Open P&L across positions.
    pub unrealized_pnl: Decimal,
    /// Margin held by open positions.
    pub used_margin: Decimal,
    /// Equity not tied up in margin.
    pub free_margin: Decimal,
    /// `equity / usedMargin * 100`, or the sentinel when no margin is used.
    pub margin_level: Decimal,
}

impl AccountState {
    /// Derive the full state from the stored balance and open positions.
    #[must_use]
    pub fn compute(
        balance: Decimal,
        realized_pnl: Decimal,
        positions: &[CanonicalPosition],
        margin_level_sentinel: Decimal,
    ) -> Self {
        let unrealized_pnl: Decimal = positions.iter().map(|p| p.unrealized_pnl).sum();
        let used_margin: Decimal = positions.iter().map(CanonicalPosition::used_margin).sum();
        let equity = balance + unrealized_pnl;
        let margin_level = if used_margin > Decimal::ZERO {
            equity / used_margin * Decimal::ONE_HUNDRED
        } else {
            margin_level_sentinel
        };

        Self {
            balance,
            equity,
            realized_pnl,
            unrealized_pnl,
            used_margin,
            free_margin: equity - used_margin,
            margin_level,
        }
    }

    /// Flat state used when the ledger cannot be read.
    #[must_use]
    pub fn fallback(balance: Decimal, margin_level_sentinel: Decimal) -> Self {
        Self::compute(balance, Decimal::ZERO, &[], margin_level_sentinel)
    }
}

/// Account descriptor listed by `accountsMetainfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetainfo {
    /// Account id.
    pub id: AccountId,
    /// Display name.
    pub name: String,
    /// Account currency code.
    pub currency: String,
    /// Currency symbol.
    pub currency_sign: String,
    /// Broker display name.
    pub broker_name: String,
    /// `demo` or `live`.
    pub account_type: String,
    /// True for paper accounts.
    pub paper_trading: bool,
}
