//! Canonical orders and order tickets.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value_objects::{OrderSide, OrderStatus, OrderType};
use crate::domain::shared::{DomainError, OrderId, Symbol};

/// An order in the front-end's canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalOrder {
    /// Ledger-assigned id.
    pub id: OrderId,
    /// Instrument.
    pub symbol: Symbol,
    /// Direction.
    pub side: OrderSide,
    /// Ordered quantity, always positive.
    pub qty: Decimal,
    /// Pricing type.
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Limit price for limit and stop-limit orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,
    /// Trigger price for stop and stop-limit orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    /// Quantity filled so far.
    pub filled_qty: Decimal,
    /// Volume-weighted fill price, zero before the first fill.
    pub avg_fill_price: Decimal,
    /// Parent order for bracket legs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<OrderId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// An order ticket submitted by the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreOrder {
    /// Instrument.
    pub symbol: Symbol,
    /// Direction.
    pub side: OrderSide,
    /// Quantity, must be positive.
    pub qty: Decimal,
    /// Pricing type.
    #[serde(rename = "type", default)]
    pub order_type: OrderType,
    /// Limit price.
    #[serde(default)]
    pub limit_price: Option<Decimal>,
    /// Stop trigger price.
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    /// Protective stop-loss price.
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    /// Take-profit price.
    #[serde(default)]
    pub take_profit: Option<Decimal>,
    /// Requested leverage.
    #[serde(default)]
    pub leverage: Option<Decimal>,
}

impl PreOrder {
    /// A market order ticket.
    #[must_use]
    pub const fn market(symbol: Symbol, side: OrderSide, qty: Decimal) -> Self {
        Self {
            symbol,
            side,
            qty,
            order_type: OrderType::Market,
            limit_price: None,
            stop_price: None,
            stop_loss: None,
            take_profit: None,
            leverage: None,
        }
    }

    /// A limit order ticket.
    #[must_use]
    pub const fn limit(symbol: Symbol, side: OrderSide, qty: Decimal, limit_price: Decimal) -> Self {
        Self {
            symbol,
            side,
            qty,
            order_type: OrderType::Limit,
            limit_price: Some(limit_price),
            stop_price: None,
            stop_loss: None,
            take_profit: None,
            leverage: None,
        }
    }

    /// Check the ticket's own fields. Symbol resolution happens elsewhere.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.symbol.is_empty() {
            return Err(DomainError::invalid("symbol", "must not be empty"));
        }
        if self.qty <= Decimal::ZERO {
            return Err(DomainError::invalid(
                "qty",
                format!("must be greater than zero, got {}", self.qty),
            ));
        }
        if self.order_type.requires_limit_price() {
            require_positive("limitPrice", self.limit_price)?;
        }
        if self.order_type.requires_stop_price() {
            require_positive("stopPrice", self.stop_price)?;
        }
        for (field, value) in [
            ("stopLoss", self.stop_loss),
            ("takeProfit", self.take_profit),
            ("leverage", self.leverage),
        ] {
            if value.is_some() {
                require_positive(field, value)?;
            }
        }
        Ok(())
    }
}

fn require_positive(field: &str, value: Option<Decimal>) -> Result<(), DomainError> {
    match value {
        Some(v) if v > Decimal::ZERO => Ok(()),
        Some(v) => Err(DomainError::invalid(field, format!("must be positive, got {v}"))),
        None => Err(DomainError::invalid(field, "is required for this order type")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn aapl() -> Symbol {
        Symbol::new("AAPL")
    }

    #[test]
    fn market_ticket_is_valid() {
        assert!(PreOrder::market(aapl(), OrderSide::Buy, dec!(1)).validate().is_ok());
    }

    #[test]
    fn zero_or_negative_qty_rejected() {
        let zero = PreOrder::market(aapl(), OrderSide::Buy, Decimal::ZERO);
        assert!(matches!(
            zero.validate(),
            Err(DomainError::InvalidValue { field, .. }) if field == "qty"
        ));
        assert!(PreOrder::market(aapl(), OrderSide::Sell, dec!(-2)).validate().is_err());
    }

    #[test]
    fn limit_requires_price() {
        let mut ticket = PreOrder::limit(aapl(), OrderSide::Buy, dec!(1), dec!(100));
        assert!(ticket.validate().is_ok());
        ticket.limit_price = None;
        assert!(ticket.validate().is_err());
    }

    #[test]
    fn stop_limit_requires_both_prices() {
        let mut ticket = PreOrder::limit(aapl(), OrderSide::Sell, dec!(1), dec!(100));
        ticket.order_type = OrderType::StopLimit;
        assert!(ticket.validate().is_err());
        ticket.stop_price = Some(dec!(101));
        assert!(ticket.validate().is_ok());
    }

    #[test]
    fn brackets_must_be_positive_when_present() {
        let mut ticket = PreOrder::market(aapl(), OrderSide::Buy, dec!(1));
        ticket.stop_loss = Some(dec!(0));
        assert!(ticket.validate().is_err());
        ticket.stop_loss = Some(dec!(90));
        ticket.leverage = Some(dec!(-1));
        assert!(ticket.validate().is_err());
    }

    #[test]
    fn pre_order_deserializes_front_end_ticket() {
        let ticket: PreOrder = serde_json::from_str(
            r#"{"symbol":"nasdaq:aapl","side":"sell","qty":"3","type":"limit","limitPrice":"251.5"}"#,
        )
        .unwrap();
        assert_eq!(ticket.symbol, aapl());
        assert_eq!(ticket.side, OrderSide::Sell);
        assert_eq!(ticket.order_type, OrderType::Limit);
        assert_eq!(ticket.limit_price, Some(dec!(251.5)));
    }
}
