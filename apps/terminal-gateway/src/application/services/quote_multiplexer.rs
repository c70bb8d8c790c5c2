//! Quote Source Multiplexer
//!
//! Chains quote sources in priority order and returns the first usable quote.
//! Each source keeps its own per-symbol rate window: inside the window the
//! last good answer from that source is reused instead of refetching.
//!
//! Resolution order: market sources, the last market quote, the fallback
//! generator, then the last quote of any origin.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::LastQuoteCache;
use crate::application::ports::QuoteSourcePort;
use crate::domain::market_data::{Instrument, InstrumentCatalog, QuoteTick};
use crate::domain::shared::Symbol;
use crate::observability::{record_quote_fallback, record_quote_fetch};

/// Cadence limits of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePolicy {
    /// How often subscriptions priced by this source poll.
    pub refresh_interval: Duration,
    /// Minimum time between two fetches of the same symbol.
    pub min_refetch_gap: Duration,
}

impl Default for SourcePolicy {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(1),
            min_refetch_gap: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
struct SlotEntry {
    last_attempt: Instant,
    last_good: Option<QuoteTick>,
    last_attempt_ok: bool,
}

struct SourceSlot {
    source: Arc<dyn QuoteSourcePort>,
    policy: SourcePolicy,
    entries: Mutex<HashMap<Symbol, SlotEntry>>,
}

enum Window {
    Reuse(QuoteTick),
    Skip,
    Fetch,
}

impl SourceSlot {
    fn window(&self, symbol: &Symbol, now: Instant) -> Window {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(symbol) {
            if now.duration_since(entry.last_attempt) < self.policy.min_refetch_gap {
                return match (&entry.last_good, entry.last_attempt_ok) {
                    (Some(tick), true) => Window::Reuse(tick.clone()),
                    _ => Window::Skip,
                };
            }
            entry.last_attempt = now;
        } else {
            entries.insert(
                symbol.clone(),
                SlotEntry {
                    last_attempt: now,
                    last_good: None,
                    last_attempt_ok: false,
                },
            );
        }
        Window::Fetch
    }

    fn settle(&self, symbol: &Symbol, tick: Option<&QuoteTick>) {
        if let Some(entry) = self.entries.lock().get_mut(symbol) {
            entry.last_attempt_ok = tick.is_some();
            if let Some(tick) = tick {
                entry.last_good = Some(tick.clone());
            }
        }
    }

    fn previous(&self, symbol: &Symbol) -> Option<QuoteTick> {
        self.entries
            .lock()
            .get(symbol)
            .and_then(|entry| entry.last_good.clone())
    }

    async fn quote(&self, instrument: &Instrument) -> Option<QuoteTick> {
        let name = self.source.name();
        let symbol = &instrument.symbol;

        match self.window(symbol, Instant::now()) {
            Window::Reuse(tick) => {
                record_quote_fetch(name, "cached", 0.0);
                return Some(tick);
            }
            Window::Skip => return None,
            Window::Fetch => {}
        }

        let started = std::time::Instant::now();
        let result = self.source.fetch_quote(instrument).await;
        let latency = started.elapsed().as_secs_f64();

        let tick = match result {
            Ok(tick) => tick,
            Err(e) => {
                tracing::warn!(source = name, symbol = %symbol, error = %e, "Quote source failed");
                record_quote_fetch(name, "error", latency);
                self.settle(symbol, None);
                return None;
            }
        };

        let stale = self
            .previous(symbol)
            .is_some_and(|prev| tick.timestamp < prev.timestamp);
        if let Err(e) = tick.validate() {
            tracing::warn!(source = name, symbol = %symbol, error = %e, "Rejected invalid quote");
            record_quote_fetch(name, "invalid", latency);
            self.settle(symbol, None);
            return None;
        }
        if stale {
            tracing::warn!(source = name, symbol = %symbol, "Rejected quote older than previous");
            record_quote_fetch(name, "invalid", latency);
            self.settle(symbol, None);
            return None;
        }

        record_quote_fetch(name, "ok", latency);
        self.settle(symbol, Some(&tick));
        Some(tick)
    }
}

/// Priority-ordered quote source chain.
///
/// # Example
///
/// ```ignore
/// let mux = QuoteMultiplexer::new(catalog, cache)
///     .with_source(live, SourcePolicy::default())
///     .with_fallback(synthetic, SourcePolicy::default());
/// let tick = mux.get_quote(&Symbol::new("AAPL")).await;
/// ```
pub struct QuoteMultiplexer {
    catalog: Arc<InstrumentCatalog>,
    cache: Arc<LastQuoteCache>,
    slots: Vec<SourceSlot>,
    fallback: Option<SourceSlot>,
}

impl QuoteMultiplexer {
    /// Multiplexer with no sources yet.
    #[must_use]
    pub fn new(catalog: Arc<InstrumentCatalog>, cache: Arc<LastQuoteCache>) -> Self {
        Self {
            catalog,
            cache,
            slots: Vec::new(),
            fallback: None,
        }
    }

    /// Append a source at the lowest priority so far.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn QuoteSourcePort>, policy: SourcePolicy) -> Self {
        self.slots.push(SourceSlot {
            source,
            policy,
            entries: Mutex::new(HashMap::new()),
        });
        self
    }

    /// Set the generator consulted once market sources and the last market
    /// quote have nothing. Replaces any earlier fallback.
    #[must_use]
    pub fn with_fallback(mut self, source: Arc<dyn QuoteSourcePort>, policy: SourcePolicy) -> Self {
        self.fallback = Some(SourceSlot {
            source,
            policy,
            entries: Mutex::new(HashMap::new()),
        });
        self
    }

    /// Instrument catalog used to resolve symbols.
    #[must_use]
    pub fn catalog(&self) -> &Arc<InstrumentCatalog> {
        &self.catalog
    }

    /// Shared last-known quote cache.
    #[must_use]
    pub fn last_quotes(&self) -> &Arc<LastQuoteCache> {
        &self.cache
    }

    /// Names of configured sources in priority order, fallback last.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        self.slots
            .iter()
            .chain(&self.fallback)
            .map(|slot| slot.source.name().to_string())
            .collect()
    }

    /// Poll cadence for `instrument`: the refresh interval of its primary source.
    #[must_use]
    pub fn poll_interval(&self, instrument: &Instrument) -> Duration {
        self.slots
            .iter()
            .chain(&self.fallback)
            .find(|slot| slot.source.supports(instrument))
            .map_or_else(
                || SourcePolicy::default().refresh_interval,
                |slot| slot.policy.refresh_interval,
            )
    }

    /// Best-effort quote for a catalog symbol. `None` for unknown symbols.
    pub async fn get_quote(&self, symbol: &Symbol) -> Option<QuoteTick> {
        let instrument = self.catalog.get(symbol)?.clone();
        self.quote_for(&instrument).await
    }

    /// Best-effort quote for `instrument`.
    ///
    /// Walks the market sources that support the instrument in priority
    /// order, then the last market quote, then the fallback generator, then
    /// the last quote of any origin. Returns `None` only when none of them
    /// has a price.
    pub async fn quote_for(&self, instrument: &Instrument) -> Option<QuoteTick> {
        let symbol = &instrument.symbol;
        let mut tried = 0_usize;

        for slot in self.slots.iter().filter(|slot| slot.source.supports(instrument)) {
            if let Some(tick) = slot.quote(instrument).await {
                if tried > 0 {
                    record_quote_fallback(slot.source.name());
                }
                self.cache.store(tick.clone());
                return Some(tick);
            }
            tried += 1;
        }

        if let Some(tick) = self.cache.market(symbol) {
            if tried > 0 {
                tracing::warn!(symbol = %symbol, "Quote sources failed, serving last market quote");
                record_quote_fallback("last_known");
            }
            return Some(tick);
        }

        let fallback = self
            .fallback
            .as_ref()
            .filter(|slot| slot.source.supports(instrument));
        if let Some(slot) = fallback {
            if let Some(tick) = slot.quote(instrument).await {
                if tried > 0 {
                    record_quote_fallback(slot.source.name());
                }
                self.cache.store_synthetic(tick.clone());
                return Some(tick);
            }
        }

        let last = self.cache.get(symbol);
        if last.is_some() {
            tracing::warn!(symbol = %symbol, "All quote sources failed, serving last known quote");
            record_quote_fallback("last_known");
        } else {
            tracing::error!(symbol = %symbol, "No quote available from any source");
        }
        last
    }
}
