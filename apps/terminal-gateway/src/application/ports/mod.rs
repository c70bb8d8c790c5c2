//! Application Ports (Driver and Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! - **Driver Ports** (Primary/Inbound): `DatafeedApi`, `BrokerApi`
//! - **Driven Ports** (Secondary/Outbound): quote sources, the ledger, bar
//!   history and the push price channel

mod bar_store_port;
mod broker_api;
mod datafeed_api;
mod price_channel_port;
mod quote_source_port;
mod record_store_port;

pub use bar_store_port::{BarRange, BarStorePort};
pub use broker_api::{BrokerApi, ModifyOrderResult, PlaceOrderResult};
pub use datafeed_api::{
    DatafeedApi, DatafeedConfiguration, DatafeedError, ExchangeDescriptor, HistoryResult,
    OnQuotes, OnRealtimeBar, PeriodParams, QuoteSnapshot, QuoteStatus, QuoteValues,
    SymbolDescriptor, SymbolInfo, SymbolTypeDescriptor,
};
pub use price_channel_port::PriceChannelPort;
pub use quote_source_port::{QuoteSourceError, QuoteSourcePort};
pub use record_store_port::{
    AccountRecord, OrderAmendment, OrderRecord, OrderSubmission, PositionRecord,
    RecordStorePort, StoreError,
};

#[cfg(test)]
pub use record_store_port::MockRecordStorePort;
