//! Quote source adapters, in default priority order.

mod http_live;
mod snapshot;
mod synthetic;

pub use http_live::LiveQuoteSource;
pub use snapshot::SnapshotQuoteSource;
pub use synthetic::SyntheticQuoteSource;
