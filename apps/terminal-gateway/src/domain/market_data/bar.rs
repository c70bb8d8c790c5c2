//! OHLCV bars.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An OHLCV summary over one fixed-width time bucket.
///
/// `time` is the bucket start in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Bucket start (unix seconds).
    pub time: i64,
    /// First price in the bucket.
    pub open: Decimal,
    /// Highest price in the bucket.
    pub high: Decimal,
    /// Lowest price in the bucket.
    pub low: Decimal,
    /// Last price in the bucket.
    pub close: Decimal,
    /// Traded volume, zero when the source does not report it.
    pub volume: Decimal,
}

impl Bar {
    /// A fresh bar where every price equals `price`.
    #[must_use]
    pub const fn opening(time: i64, price: Decimal) -> Self {
        Self {
            time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::ZERO,
        }
    }

    /// Fold a new price into this bar.
    pub fn absorb(&mut self, price: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }

    /// `high >= max(open, close)` and `low <= min(open, close)`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }
}
