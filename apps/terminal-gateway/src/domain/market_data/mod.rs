//! Market Data Bounded Context
//!
//! Quotes, bars, resolutions, the instrument catalog and the pure algorithms
//! that turn quotes into bars.

mod aggregator;
mod bar;
mod instrument;
mod quote;
mod random_walk;
mod resolution;

pub use aggregator::{BarAggregator, BarUpdate};
pub use bar::Bar;
pub use instrument::{Instrument, InstrumentCatalog, InstrumentClass};
pub use quote::QuoteTick;
pub use random_walk::{RandomWalk, WalkParams, seed_from, synthetic_bars};
pub use resolution::Resolution;
