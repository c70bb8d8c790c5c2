//! Quote ticks as observed from an upstream source.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{DomainError, Symbol};

/// A single bid/ask observation for a symbol.
///
/// The mid price is never stored: [`QuoteTick::mid`] always derives it from
/// bid and ask, so a provider-supplied mid can never drift from the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTick {
    /// Symbol the quote belongs to.
    pub symbol: Symbol,
    /// Best bid price.
    pub bid: Decimal,
    /// Best ask price.
    pub ask: Decimal,
    /// Size at the bid.
    pub bid_size: Decimal,
    /// Size at the ask.
    pub ask_size: Decimal,
    /// Observation time reported by the source.
    pub timestamp: DateTime<Utc>,
}

impl QuoteTick {
    /// Create a quote from a full book top.
    #[must_use]
    pub const fn new(
        symbol: Symbol,
        bid: Decimal,
        ask: Decimal,
        bid_size: Decimal,
        ask_size: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol,
            bid,
            ask,
            bid_size,
            ask_size,
            timestamp,
        }
    }

    /// Synthesize bid/ask around a single price with a symmetric spread.
    ///
    /// `spread_fraction` is applied on each side, so `0.0005` puts the bid
    /// 0.05% under and the ask 0.05% over `price`.
    #[must_use]
    pub fn around(
        symbol: Symbol,
        price: Decimal,
        spread_fraction: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let half = price * spread_fraction;
        Self::new(
            symbol,
            price - half,
            price + half,
            Decimal::ZERO,
            Decimal::ZERO,
            timestamp,
        )
    }

    /// Mid price, `(bid + ask) / 2`.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// Absolute spread, `ask - bid`.
    #[must_use]
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Observation time as unix seconds.
    #[must_use]
    pub fn unix_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }

    /// Reject quotes no consumer should ever price against.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.bid <= Decimal::ZERO {
            return Err(DomainError::invalid("bid", format!("{} is not positive", self.bid)));
        }
        if self.ask < self.bid {
            return Err(DomainError::invalid(
                "ask",
                format!("{} is below bid {}", self.ask, self.bid),
            ));
        }
        Ok(())
    }
}
