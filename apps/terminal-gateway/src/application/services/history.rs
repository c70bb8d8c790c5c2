//! Historical bar retrieval.
//!
//! Stateless three-tier lookup: stored bars, then backend computation, then
//! synthetic bars walked back from the last known price.

use std::sync::Arc;

use super::LastQuoteCache;
use crate::application::ports::{BarRange, BarStorePort, HistoryResult};
use crate::domain::market_data::{Bar, Instrument, Resolution, seed_from, synthetic_bars};
use crate::observability::record_history_source;

/// Limits of a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySettings {
    /// Most synthetic bars returned for one request.
    pub max_synthetic_bars: usize,
    /// Most stored rows read for one request.
    pub stored_bar_limit: usize,
    /// Extra seed mixed into synthetic history.
    pub seed: u64,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_synthetic_bars: 500,
            stored_bar_limit: 1_000,
            seed: 0,
        }
    }
}

/// Serves `getBars`.
pub struct HistoryService {
    store: Option<Arc<dyn BarStorePort>>,
    quotes: Arc<LastQuoteCache>,
    settings: HistorySettings,
}

impl HistoryService {
    /// History with an optional backend bar store.
    #[must_use]
    pub fn new(
        store: Option<Arc<dyn BarStorePort>>,
        quotes: Arc<LastQuoteCache>,
        settings: HistorySettings,
    ) -> Self {
        Self {
            store,
            quotes,
            settings,
        }
    }

    /// Most bars a synthetic answer holds.
    #[must_use]
    pub const fn max_bars(&self) -> usize {
        self.settings.max_synthetic_bars
    }

    /// Bars for `instrument` over `range`, ascending by time.
    ///
    /// Never fails. `no_data` is set only when the range is empty or no tier,
    /// synthetic included, produced a bar.
    pub async fn bars(
        &self,
        instrument: &Instrument,
        resolution: Resolution,
        range: BarRange,
    ) -> HistoryResult {
        if range.is_empty() {
            record_history_source("empty", 0);
            return HistoryResult {
                bars: Vec::new(),
                no_data: true,
            };
        }

        let symbol = &instrument.symbol;
        if let Some(store) = &self.store {
            match store
                .stored_bars(symbol, resolution, range, self.settings.stored_bar_limit)
                .await
            {
                Ok(rows) => {
                    let bars = normalize(rows, range, resolution);
                    if !bars.is_empty() {
                        record_history_source("stored", bars.len());
                        return found(bars);
                    }
                    tracing::debug!(symbol = %symbol, resolution = %resolution, "No stored bars");
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Stored bar lookup failed");
                }
            }

            match store.compute_bars(symbol, resolution, range).await {
                Ok(rows) => {
                    let bars = normalize(rows, range, resolution);
                    if !bars.is_empty() {
                        record_history_source("computed", bars.len());
                        return found(bars);
                    }
                    tracing::debug!(symbol = %symbol, resolution = %resolution, "Computation returned no bars");
                }
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "Bar computation failed");
                }
            }
        }

        let anchor = self
            .quotes
            .mid(symbol)
            .unwrap_or(instrument.base_price);
        let seed = seed_from(&[
            symbol.as_str(),
            resolution.code(),
            &range.from.to_string(),
            &self.settings.seed.to_string(),
        ]);
        let bars = synthetic_bars(
            anchor,
            range.from,
            range.to,
            resolution,
            self.settings.max_synthetic_bars,
            seed,
            instrument.price_decimals(),
        );

        tracing::info!(
            symbol = %symbol,
            resolution = %resolution,
            bars = bars.len(),
            "Serving synthetic history"
        );
        record_history_source(if bars.is_empty() { "empty" } else { "synthetic" }, bars.len());
        let no_data = bars.is_empty();
        HistoryResult { bars, no_data }
    }
}

const fn found(bars: Vec<Bar>) -> HistoryResult {
    HistoryResult {
        bars,
        no_data: false,
    }
}

/// Keep consistent bars overlapping the range, sorted and unique by time.
fn normalize(mut rows: Vec<Bar>, range: BarRange, resolution: Resolution) -> Vec<Bar> {
    let width = resolution.seconds();
    rows.retain(|bar| {
        let keep = bar.is_consistent() && range.overlaps(bar.time, width);
        if !bar.is_consistent() {
            tracing::warn!(time = bar.time, "Dropping inconsistent backend bar");
        }
        keep
    });
    rows.sort_by_key(|bar| bar.time);
    rows.dedup_by_key(|bar| bar.time);
    rows
}
