//! Symbol value object for instrument tickers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A trading symbol such as `AAPL`, `BTCUSD` or `EURUSD`.
///
/// Normalized to uppercase with surrounding whitespace and any exchange prefix
/// (`NASDAQ:AAPL`) removed, so lookups are insensitive to how the front-end
/// spells the ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a new normalized symbol.
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        let raw = value.as_ref().trim();
        let ticker = raw.rsplit_once(':').map_or(raw, |(_, ticker)| ticker);
        Self(ticker.trim().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the symbol is empty after normalization.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Base asset of a `XXXUSD` style pair (`BTCUSD` -> `BTC`).
    ///
    /// Returns the full symbol when there is no `USD` quote suffix.
    #[must_use]
    pub fn base_asset(&self) -> &str {
        match self.0.strip_suffix("USD") {
            Some(base) if !base.is_empty() => base,
            _ => &self.0,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
