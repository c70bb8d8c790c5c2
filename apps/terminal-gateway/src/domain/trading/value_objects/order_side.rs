//! Order and position side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an order or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy order / long position.
    Buy,
    /// Sell order / short position.
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Side code written to the ledger.
    #[must_use]
    pub const fn as_backend(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    /// Map a ledger side string. Unrecognized values read as buy.
    #[must_use]
    pub fn from_backend(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "sell" | "short" | "s" | "-1" | "2" => Self::Sell,
            "buy" | "long" | "b" | "1" => Self::Buy,
            other => {
                tracing::debug!(side = other, "Unrecognized side, reading as buy");
                Self::Buy
            }
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn opposite_side() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test_case("BUY", OrderSide::Buy)]
    #[test_case("sell", OrderSide::Sell)]
    #[test_case("long", OrderSide::Buy)]
    #[test_case(" Short ", OrderSide::Sell)]
    #[test_case("-1", OrderSide::Sell)]
    #[test_case("garbage", OrderSide::Buy)]
    fn maps_backend_sides(raw: &str, expected: OrderSide) {
        assert_eq!(OrderSide::from_backend(raw), expected);
    }
}
