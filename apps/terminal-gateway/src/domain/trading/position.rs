//! Canonical open positions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value_objects::OrderSide;
use crate::domain::shared::{PositionId, Symbol};

/// An open position in the front-end's canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPosition {
    /// Ledger-assigned id.
    pub id: PositionId,
    /// Instrument.
    pub symbol: Symbol,
    /// Long (buy) or short (sell).
    pub side: OrderSide,
    /// Open quantity, always positive.
    pub qty: Decimal,
    /// Average entry price.
    pub avg_open_price: Decimal,
    /// Mark price used for P&L.
    pub current_price: Decimal,
    /// Mark-to-market P&L.
    pub unrealized_pnl: Decimal,
    /// P&L already booked on partial closes.
    pub realized_pnl: Decimal,
    /// Units per contract.
    pub contract_size: Decimal,
    /// Leverage the position was opened with.
    pub leverage: Decimal,
}

impl CanonicalPosition {
    /// Mark-to-market P&L for a side, quantity and price pair.
    #[must_use]
    pub fn unrealized(side: OrderSide, qty: Decimal, open: Decimal, current: Decimal) -> Decimal {
        match side {
            OrderSide::Buy => qty * (current - open),
            OrderSide::Sell => qty * (open - current),
        }
    }

    /// Re-mark the position at `price`.
    pub fn mark(&mut self, price: Decimal) {
        self.current_price = price;
        self.unrealized_pnl =
            Self::unrealized(self.side, self.qty, self.avg_open_price, self.current_price);
    }

    /// `pnl / (avgOpenPrice * qty) * 100`, zero when there is no cost basis.
    #[must_use]
    pub fn pnl_percent(&self) -> Decimal {
        let basis = self.avg_open_price * self.qty;
        if basis.is_zero() {
            Decimal::ZERO
        } else {
            self.unrealized_pnl / basis * Decimal::ONE_HUNDRED
        }
    }

    /// Margin held: `|qty| * contractSize / leverage`.
    ///
    /// Non-positive leverage counts as 1.
    #[must_use]
    pub fn used_margin(&self) -> Decimal {
        let leverage = if self.leverage > Decimal::ZERO {
            self.leverage
        } else {
            Decimal::ONE
        };
        self.qty.abs() * self.contract_size / leverage
    }
}
