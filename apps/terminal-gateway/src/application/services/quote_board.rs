//! Quote snapshots for the watchlist and order ticket.

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use super::QuoteMultiplexer;
use crate::application::ports::{QuoteSnapshot, QuoteStatus, QuoteValues};
use crate::domain::market_data::{Instrument, QuoteTick};
use crate::domain::shared::Symbol;

/// Open/high/low/previous close of the current UTC day, built from observed mids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SessionStats {
    day: NaiveDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    last: Decimal,
    prev_close: Decimal,
}

impl SessionStats {
    fn start(day: NaiveDate, price: Decimal, prev_close: Decimal) -> Self {
        Self {
            day,
            open: price,
            high: price,
            low: price,
            last: price,
            prev_close,
        }
    }

    fn observe(self, at: DateTime<Utc>, price: Decimal) -> Self {
        let day = at.date_naive();
        if day > self.day {
            return Self::start(day, price, self.last);
        }
        Self {
            high: self.high.max(price),
            low: self.low.min(price),
            last: price,
            ..self
        }
    }
}

/// Builds quote snapshots and tracks per-symbol session statistics.
pub struct QuoteBoard {
    multiplexer: Arc<QuoteMultiplexer>,
    sessions: Mutex<HashMap<Symbol, SessionStats>>,
}

impl QuoteBoard {
    /// Board over `multiplexer`.
    #[must_use]
    pub fn new(multiplexer: Arc<QuoteMultiplexer>) -> Self {
        Self {
            multiplexer,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// One snapshot per requested name, in request order.
    ///
    /// Known symbols always get an `ok` entry while any source or the
    /// last-known cache has a price; unknown names get an `error` entry.
    pub async fn snapshots(&self, names: &[String]) -> Vec<QuoteSnapshot> {
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            out.push(self.snapshot(name).await);
        }
        out
    }

    async fn snapshot(&self, name: &str) -> QuoteSnapshot {
        let symbol = Symbol::new(name);
        let Some(instrument) = self.multiplexer.catalog().get(&symbol).cloned() else {
            return error_snapshot(name, format!("Unknown symbol: {name}"));
        };
        match self.multiplexer.quote_for(&instrument).await {
            Some(tick) => self.ok_snapshot(name, &instrument, &tick),
            None => error_snapshot(name, format!("No quote available for {name}")),
        }
    }

    fn ok_snapshot(&self, name: &str, instrument: &Instrument, tick: &QuoteTick) -> QuoteSnapshot {
        let mid = instrument.round_price(tick.mid());
        let stats = {
            let mut sessions = self.sessions.lock();
            let stats = sessions.get(&instrument.symbol).map_or_else(
                || SessionStats::start(tick.timestamp.date_naive(), mid, mid),
                |stats| stats.observe(tick.timestamp, mid),
            );
            sessions.insert(instrument.symbol.clone(), stats);
            stats
        };

        let change = mid - stats.prev_close;
        let change_percent = if stats.prev_close.is_zero() {
            Decimal::ZERO
        } else {
            (change / stats.prev_close * Decimal::ONE_HUNDRED).round_dp(2)
        };

        QuoteSnapshot {
            s: QuoteStatus::Ok,
            n: name.to_string(),
            v: Some(QuoteValues {
                ch: change,
                chp: change_percent,
                short_name: instrument.symbol.to_string(),
                exchange: instrument.exchange.clone(),
                description: instrument.description.clone(),
                lp: mid,
                ask: tick.ask,
                bid: tick.bid,
                spread: tick.spread(),
                open_price: stats.open,
                high_price: stats.high,
                low_price: stats.low,
                prev_close_price: stats.prev_close,
                volume: Decimal::ZERO,
            }),
            errmsg: None,
        }
    }
}

fn error_snapshot(name: &str, message: String) -> QuoteSnapshot {
    QuoteSnapshot {
        s: QuoteStatus::Error,
        n: name.to_string(),
        v: None,
        errmsg: Some(message),
    }
}
