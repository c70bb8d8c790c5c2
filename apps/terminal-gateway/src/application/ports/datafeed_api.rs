//! Datafeed API (Driver Port)
//!
//! The full capability set the charting front-end calls. Every method either
//! returns a value or a typed error; none of them hang.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::market_data::{Bar, Resolution};
use crate::domain::shared::SubscriberId;

/// Realtime bar callback.
pub type OnRealtimeBar = Arc<dyn Fn(Bar) + Send + Sync>;

/// Realtime quote callback, invoked with every snapshot of one poll.
pub type OnQuotes = Arc<dyn Fn(Vec<QuoteSnapshot>) + Send + Sync>;

/// Datafeed request failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatafeedError {
    /// The symbol is not in the catalog.
    #[error("Unknown symbol: {name}")]
    UnknownSymbol {
        /// Requested name.
        name: String,
    },

    /// The resolution is not served for this symbol.
    #[error("Unsupported resolution: {resolution}")]
    UnsupportedResolution {
        /// Requested resolution code.
        resolution: String,
    },

    /// The requested range ends before it starts or leaves the supported window.
    #[error("Invalid range: from {from} to {to}")]
    InvalidRange {
        /// Range start, unix seconds.
        from: i64,
        /// Range end, unix seconds.
        to: i64,
    },
}

/// Exchange entry of the datafeed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeDescriptor {
    /// Filter value.
    pub value: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub desc: String,
}

/// Symbol type entry of the datafeed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTypeDescriptor {
    /// Display name.
    pub name: String,
    /// Filter value.
    pub value: String,
}

/// Answer to `onReady`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatafeedConfiguration {
    /// Resolutions the chart may request.
    pub supported_resolutions: Vec<Resolution>,
    /// Exchanges for the search filter.
    pub exchanges: Vec<ExchangeDescriptor>,
    /// Symbol types for the search filter.
    pub symbols_types: Vec<SymbolTypeDescriptor>,
    /// Bar marks are served.
    pub supports_marks: bool,
    /// Timescale marks are served.
    pub supports_timescale_marks: bool,
    /// Server time is served.
    pub supports_time: bool,
    /// Symbol search is served.
    pub supports_search: bool,
    /// Group requests are served.
    pub supports_group_request: bool,
}

/// Search result entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDescriptor {
    /// Ticker.
    pub symbol: String,
    /// `EXCHANGE:TICKER`.
    pub full_name: String,
    /// Human readable name.
    pub description: String,
    /// Listing venue.
    pub exchange: String,
    /// Ticker used in later requests.
    pub ticker: String,
    /// Symbol type.
    #[serde(rename = "type")]
    pub symbol_type: String,
}

/// Symbol metadata returned by `resolveSymbol`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Ticker.
    pub name: String,
    /// Ticker used in later requests.
    pub ticker: String,
    /// Human readable name.
    pub description: String,
    /// Symbol type.
    #[serde(rename = "type")]
    pub symbol_type: String,
    /// Listing venue.
    pub exchange: String,
    /// Listing venue shown in the legend.
    pub listed_exchange: String,
    /// Trading session.
    pub session: String,
    /// Session timezone.
    pub timezone: String,
    /// Minimal price movement in pricescale units.
    pub minmov: u32,
    /// Price scale.
    pub pricescale: u32,
    /// Intraday bars are served.
    pub has_intraday: bool,
    /// Daily bars are served.
    pub has_daily: bool,
    /// Weekly and monthly bars are served.
    pub has_weekly_and_monthly: bool,
    /// Resolutions served for this symbol.
    pub supported_resolutions: Vec<Resolution>,
    /// Volume decimals.
    pub volume_precision: u32,
    /// Data status badge.
    pub data_status: String,
}

/// Time range of a history request, unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodParams {
    /// Range start, inclusive.
    pub from: i64,
    /// Range end, exclusive.
    pub to: i64,
    /// Bars the chart would like at minimum. The start moves back to cover
    /// them, up to the synthetic bar cap.
    #[serde(default)]
    pub count_back: Option<usize>,
}

/// Answer to `getBars`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResult {
    /// Bars in ascending time order.
    pub bars: Vec<Bar>,
    /// True when there is nothing to show for the range.
    pub no_data: bool,
}

/// Outcome flag of a quote snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    /// Values are present.
    Ok,
    /// The symbol could not be priced.
    Error,
}

/// Quote values of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteValues {
    /// Change since previous close.
    pub ch: Decimal,
    /// Percent change since previous close.
    pub chp: Decimal,
    /// Ticker.
    pub short_name: String,
    /// Listing venue.
    pub exchange: String,
    /// Human readable name.
    pub description: String,
    /// Last price (mid).
    pub lp: Decimal,
    /// Ask.
    pub ask: Decimal,
    /// Bid.
    pub bid: Decimal,
    /// Ask minus bid.
    pub spread: Decimal,
    /// Session open.
    pub open_price: Decimal,
    /// Session high.
    pub high_price: Decimal,
    /// Session low.
    pub low_price: Decimal,
    /// Previous session close.
    pub prev_close_price: Decimal,
    /// Session volume.
    pub volume: Decimal,
}

/// One entry of `getQuotes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    /// Outcome.
    pub s: QuoteStatus,
    /// Requested symbol.
    pub n: String,
    /// Values when `s == ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<QuoteValues>,
    /// Error text when `s == error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errmsg: Option<String>,
}

/// Charting datafeed.
#[async_trait]
pub trait DatafeedApi: Send + Sync {
    /// Datafeed capabilities. Resolves after yielding to the scheduler.
    async fn on_ready(&self) -> DatafeedConfiguration;

    /// Symbols matching a free-text query, optionally filtered.
    fn search_symbols(&self, user_input: &str, exchange: &str, symbol_type: &str)
    -> Vec<SymbolDescriptor>;

    /// Metadata for one symbol.
    fn resolve_symbol(&self, name: &str) -> Result<SymbolInfo, DatafeedError>;

    /// Historical bars for a closed range.
    async fn get_bars(
        &self,
        symbol_info: &SymbolInfo,
        resolution: Resolution,
        period: PeriodParams,
    ) -> Result<HistoryResult, DatafeedError>;

    /// Start realtime bars for `subscriber_id`, replacing any previous
    /// subscription under the same id. Must be called inside a Tokio runtime.
    fn subscribe_bars(
        &self,
        symbol_info: &SymbolInfo,
        resolution: Resolution,
        on_bar: OnRealtimeBar,
        subscriber_id: SubscriberId,
    ) -> Result<(), DatafeedError>;

    /// Stop realtime bars. Idempotent.
    fn unsubscribe_bars(&self, subscriber_id: &SubscriberId);

    /// Quote snapshot per requested symbol.
    async fn get_quotes(&self, symbols: &[String]) -> Vec<QuoteSnapshot>;

    /// Start realtime quotes for the union of `symbols` and `fast_symbols`.
    fn subscribe_quotes(
        &self,
        symbols: &[String],
        fast_symbols: &[String],
        on_update: OnQuotes,
        listener_id: SubscriberId,
    );

    /// Stop realtime quotes. Idempotent.
    fn unsubscribe_quotes(&self, listener_id: &SubscriberId);

    /// Server clock, unix seconds.
    fn server_time(&self) -> i64;
}
