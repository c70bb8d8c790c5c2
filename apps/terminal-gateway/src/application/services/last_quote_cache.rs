//! Process-wide last-known quote per symbol.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::market_data::QuoteTick;
use crate::domain::shared::Symbol;

/// Last quotes per symbol.
#[derive(Debug)]
struct Entry {
    latest: QuoteTick,
    latest_is_synthetic: bool,
    market: Option<QuoteTick>,
}

/// Last quote served for each symbol.
///
/// Written by the quote multiplexer and the push path, read by history
/// fallback, position marking and order pricing. Entries are replaced
/// whole, never patched. Market quotes (provider or push) are remembered
/// apart from synthetic ones so a real price is never shadowed by the
/// generator.
#[derive(Debug, Default)]
pub struct LastQuoteCache {
    quotes: RwLock<HashMap<Symbol, Entry>>,
}

impl LastQuoteCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a market quote for the tick's symbol.
    ///
    /// A tick older than the cached market quote is ignored. A market quote
    /// always replaces a synthetic one.
    pub fn store(&self, tick: QuoteTick) {
        let mut quotes = self.quotes.write();
        match quotes.get_mut(&tick.symbol) {
            Some(entry) => {
                if entry
                    .market
                    .as_ref()
                    .is_some_and(|market| market.timestamp > tick.timestamp)
                {
                    return;
                }
                if entry.latest_is_synthetic || entry.latest.timestamp <= tick.timestamp {
                    entry.latest = tick.clone();
                    entry.latest_is_synthetic = false;
                }
                entry.market = Some(tick);
            }
            None => {
                quotes.insert(
                    tick.symbol.clone(),
                    Entry {
                        latest: tick.clone(),
                        latest_is_synthetic: false,
                        market: Some(tick),
                    },
                );
            }
        }
    }

    /// Remember a generated quote. Never touches the market quote.
    pub fn store_synthetic(&self, tick: QuoteTick) {
        let mut quotes = self.quotes.write();
        match quotes.get_mut(&tick.symbol) {
            Some(entry) if entry.latest.timestamp > tick.timestamp => {}
            Some(entry) => {
                entry.latest = tick;
                entry.latest_is_synthetic = true;
            }
            None => {
                quotes.insert(
                    tick.symbol.clone(),
                    Entry {
                        latest: tick,
                        latest_is_synthetic: true,
                        market: None,
                    },
                );
            }
        }
    }

    /// Last quote for `symbol`, of any origin.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<QuoteTick> {
        self.quotes.read().get(symbol).map(|entry| entry.latest.clone())
    }

    /// Last market quote for `symbol`.
    #[must_use]
    pub fn market(&self, symbol: &Symbol) -> Option<QuoteTick> {
        self.quotes
            .read()
            .get(symbol)
            .and_then(|entry| entry.market.clone())
    }

    /// Last mid for `symbol`.
    #[must_use]
    pub fn mid(&self, symbol: &Symbol) -> Option<Decimal> {
        self.quotes.read().get(symbol).map(|entry| entry.latest.mid())
    }

    /// Number of symbols with a quote.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.read().len()
    }

    /// True when nothing has been quoted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn tick(secs: i64, bid: Decimal, ask: Decimal) -> QuoteTick {
        QuoteTick::new(
            Symbol::new("AAPL"),
            bid,
            ask,
            dec!(1),
            dec!(1),
            Utc.timestamp_opt(secs, 0).unwrap(),
        )
    }

    #[test]
    fn store_replaces_whole_record() {
        let cache = LastQuoteCache::new();
        cache.store(tick(1, dec!(99), dec!(101)));
        cache.store(tick(2, dec!(109), dec!(111)));

        let symbol = Symbol::new("AAPL");
        assert_eq!(cache.mid(&symbol), Some(dec!(110)));
        assert_eq!(cache.get(&symbol).unwrap().bid, dec!(109));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn older_tick_is_ignored() {
        let cache = LastQuoteCache::new();
        cache.store(tick(10, dec!(99), dec!(101)));
        cache.store(tick(5, dec!(1), dec!(3)));
        assert_eq!(cache.mid(&Symbol::new("AAPL")), Some(dec!(100)));
    }

    #[test]
    fn market_quote_replaces_synthetic_regardless_of_time() {
        let cache = LastQuoteCache::new();
        let symbol = Symbol::new("AAPL");
        cache.store_synthetic(tick(100, dec!(49), dec!(51)));
        assert_eq!(cache.mid(&symbol), Some(dec!(50)));
        assert!(cache.market(&symbol).is_none());

        cache.store(tick(90, dec!(99), dec!(101)));
        assert_eq!(cache.mid(&symbol), Some(dec!(100)));
        assert_eq!(cache.market(&symbol).unwrap().mid(), dec!(100));
    }

    #[test]
    fn synthetic_quote_keeps_the_market_quote() {
        let cache = LastQuoteCache::new();
        let symbol = Symbol::new("AAPL");
        cache.store(tick(1, dec!(99), dec!(101)));
        cache.store_synthetic(tick(2, dec!(9), dec!(11)));

        assert_eq!(cache.mid(&symbol), Some(dec!(10)));
        assert_eq!(cache.market(&symbol).unwrap().mid(), dec!(100));
    }

    #[test]
    fn unknown_symbol_is_none() {
        let cache = LastQuoteCache::new();
        assert!(cache.is_empty());
        assert!(cache.get(&Symbol::new("MSFT")).is_none());
    }
}
