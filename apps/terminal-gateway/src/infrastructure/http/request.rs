//! HTTP request DTOs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::market_data::{QuoteTick, Resolution};
use crate::domain::shared::{OrderId, Symbol};
use crate::domain::trading::PreOrder;

/// `GET /api/v1/datafeed/search` query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text input.
    #[serde(default)]
    pub query: String,
    /// Exchange filter, empty for all.
    #[serde(default)]
    pub exchange: String,
    /// Symbol type filter, empty for all.
    #[serde(default, rename = "type")]
    pub symbol_type: String,
}

/// `GET /api/v1/datafeed/bars` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarsQuery {
    /// Symbol name.
    pub symbol: String,
    /// Resolution code (`1`, `60`, `1D`, ...).
    pub resolution: Resolution,
    /// Range start, unix seconds.
    pub from: i64,
    /// Range end, unix seconds.
    pub to: i64,
    /// Bars the chart would like at minimum.
    #[serde(default)]
    pub countback: Option<usize>,
}

/// `GET /api/v1/datafeed/bars/stream` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarStreamQuery {
    /// Symbol name.
    pub symbol: String,
    /// Resolution code.
    pub resolution: Resolution,
    /// Listener id. A fresh one is generated when absent.
    #[serde(default)]
    pub subscriber_id: Option<String>,
}

/// `GET /api/v1/datafeed/quotes` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesQuery {
    /// Comma-separated symbol names.
    pub symbols: String,
}

impl QuotesQuery {
    /// Requested names, trimmed, empty entries dropped.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.symbols
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

/// `POST /api/v1/prices` body: one pushed price update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdateRequest {
    /// Instrument.
    pub symbol: Symbol,
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
    /// Size at the bid.
    #[serde(default)]
    pub bid_size: Decimal,
    /// Size at the ask.
    #[serde(default)]
    pub ask_size: Decimal,
    /// Observation time, now when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PriceUpdateRequest {
    /// The update as a quote tick.
    #[must_use]
    pub fn into_tick(self) -> QuoteTick {
        QuoteTick::new(
            self.symbol,
            self.bid,
            self.ask,
            self.bid_size,
            self.ask_size,
            self.timestamp.unwrap_or_else(Utc::now),
        )
    }
}

/// `POST /api/v1/accounts/{id}/orders` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    /// The order ticket.
    #[serde(flatten)]
    pub order: PreOrder,
    /// Parent order for bracket legs.
    #[serde(default)]
    pub parent_id: Option<OrderId>,
}
