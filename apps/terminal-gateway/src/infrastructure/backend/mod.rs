//! REST ledger backend: tables for accounts, positions, orders and candles,
//! plus the candle computation function.

mod bar_store;
mod record_store;
mod rest_client;
mod rows;

pub use bar_store::RestBarStore;
pub use record_store::RestRecordStore;
pub use rest_client::{BackendClient, RetryPolicy};
