//! Deterministic synthetic quotes: a seeded bounded random walk per symbol,
//! starting at the catalog base price.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;

use crate::application::ports::{QuoteSourceError, QuoteSourcePort};
use crate::domain::market_data::{Instrument, QuoteTick, RandomWalk, WalkParams, seed_from};
use crate::domain::shared::Symbol;

/// Last-resort quote source. Prices every instrument with a positive base
/// price.
pub struct SyntheticQuoteSource {
    seed: u64,
    spread_fraction: Decimal,
    walks: Mutex<HashMap<Symbol, RandomWalk>>,
}

impl SyntheticQuoteSource {
    /// Generator mixing `seed` into every symbol's walk.
    #[must_use]
    pub fn new(seed: u64, spread_fraction: f64) -> Self {
        Self {
            seed,
            spread_fraction: Decimal::from_f64(spread_fraction).unwrap_or_default(),
            walks: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl QuoteSourcePort for SyntheticQuoteSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn supports(&self, instrument: &Instrument) -> bool {
        instrument.base_price > Decimal::ZERO
    }

    async fn fetch_quote(&self, instrument: &Instrument) -> Result<QuoteTick, QuoteSourceError> {
        let (price, size) = {
            let mut walks = self.walks.lock();
            let walk = walks.entry(instrument.symbol.clone()).or_insert_with(|| {
                let seed = seed_from(&[instrument.symbol.as_str(), &self.seed.to_string()]);
                RandomWalk::new(instrument.base_price, WalkParams::QUOTES, seed)
            });
            (walk.step(), walk.size(1, 100))
        };

        let mid = instrument.round_price(price);
        if mid <= Decimal::ZERO {
            return Err(QuoteSourceError::Empty {
                symbol: instrument.symbol.to_string(),
            });
        }
        let mut tick = QuoteTick::around(
            instrument.symbol.clone(),
            mid,
            self.spread_fraction,
            Utc::now(),
        );
        tick.bid_size = size;
        tick.ask_size = size;
        Ok(tick)
    }
}
