//! Quote Source Port (Driven Port)
//!
//! One upstream provider of bid/ask quotes. The multiplexer chains several
//! of these behind a fallback order.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::market_data::{Instrument, QuoteTick};

/// Why a source could not produce a quote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteSourceError {
    /// Transport or HTTP status failure.
    #[error("Quote source request failed: {message}")]
    Http {
        /// Error description.
        message: String,
    },

    /// The provider is throttling us.
    #[error("Quote source rate limited")]
    RateLimited,

    /// The provider answered without a price for the symbol.
    #[error("No quote for {symbol}")]
    Empty {
        /// Requested symbol.
        symbol: String,
    },

    /// The payload could not be decoded.
    #[error("Malformed quote payload: {message}")]
    Decode {
        /// Error description.
        message: String,
    },
}

/// Port for a single upstream quote provider.
#[async_trait]
pub trait QuoteSourcePort: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &str;

    /// Whether this source can price `instrument`.
    fn supports(&self, instrument: &Instrument) -> bool;

    /// Fetch the latest quote for `instrument`.
    async fn fetch_quote(&self, instrument: &Instrument) -> Result<QuoteTick, QuoteSourceError>;
}
