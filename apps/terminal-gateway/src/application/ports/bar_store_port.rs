//! Bar Store Port (Driven Port)
//!
//! Backend-held history: a table of pre-computed bars and a computation
//! endpoint that aggregates raw trades on demand.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::market_data::{Bar, Resolution};
use crate::domain::shared::Symbol;

/// Half-open time range `[from, to)` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarRange {
    /// Inclusive start.
    pub from: i64,
    /// Exclusive end.
    pub to: i64,
}

impl BarRange {
    /// Earliest accepted start, 1900-01-01T00:00:00Z.
    pub const EARLIEST: i64 = -2_208_988_800;
    /// Latest accepted end, 9999-12-31T23:59:59Z.
    pub const LATEST: i64 = 253_402_300_799;

    /// Build a range.
    #[must_use]
    pub const fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// True when the range covers no time.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.to <= self.from
    }

    /// True when both ends lie within [`Self::EARLIEST`, `Self::LATEST`].
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.from >= Self::EARLIEST && self.to <= Self::LATEST
    }

    /// True when a bar starting at `time` with `width` overlaps the range.
    #[must_use]
    pub const fn overlaps(&self, time: i64, width: i64) -> bool {
        time < self.to && time.saturating_add(width) > self.from
    }
}

/// Port for backend bar history.
#[async_trait]
pub trait BarStorePort: Send + Sync {
    /// Pre-computed bars, at most `limit` rows.
    async fn stored_bars(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
        range: BarRange,
        limit: usize,
    ) -> Result<Vec<Bar>, StoreError>;

    /// Ask the backend to aggregate bars for the range.
    async fn compute_bars(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
        range: BarRange,
    ) -> Result<Vec<Bar>, StoreError>;
}
