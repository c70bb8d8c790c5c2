//! Quote source configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::services::SourcePolicy;
use crate::domain::market_data::InstrumentClass;

/// Quote sources in priority order: live, snapshot, then the synthetic
/// fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeedsConfig {
    /// Per-symbol REST last-quote provider.
    #[serde(default)]
    pub live: LiveFeedConfig,
    /// Batched REST price snapshot provider.
    #[serde(default)]
    pub snapshot: SnapshotFeedConfig,
    /// Seeded random-walk generator.
    #[serde(default)]
    pub synthetic: SyntheticFeedConfig,
}

/// Per-symbol last-quote provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveFeedConfig {
    /// Whether the provider is queried.
    pub enabled: bool,
    /// Base URL.
    pub url: String,
    /// API key.
    pub api_key: String,
    /// Poll cadence of subscriptions priced by this provider, milliseconds.
    pub refresh_interval_ms: u64,
    /// Minimum time between two fetches of one symbol, milliseconds.
    pub min_refetch_gap_ms: u64,
    /// Instrument classes the provider prices.
    pub classes: Vec<InstrumentClass>,
}

impl Default for LiveFeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "https://api.finage.co.uk".to_string(),
            api_key: String::new(),
            refresh_interval_ms: 1_000,
            min_refetch_gap_ms: 1_000,
            classes: vec![InstrumentClass::Stock],
        }
    }
}

impl LiveFeedConfig {
    /// Multiplexer policy for this provider.
    #[must_use]
    pub const fn policy(&self) -> SourcePolicy {
        policy(self.refresh_interval_ms, self.min_refetch_gap_ms)
    }
}

/// Batched price snapshot provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotFeedConfig {
    /// Whether the provider is queried.
    pub enabled: bool,
    /// Base URL.
    pub url: String,
    /// API key.
    pub api_key: String,
    /// Quote currency of the snapshot.
    pub convert: String,
    /// Poll cadence of subscriptions priced by this provider, milliseconds.
    pub refresh_interval_ms: u64,
    /// Minimum time between two batch fetches, milliseconds.
    pub min_refetch_gap_ms: u64,
    /// Instrument classes the provider prices.
    pub classes: Vec<InstrumentClass>,
}

impl Default for SnapshotFeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "https://pro-api.coinmarketcap.com".to_string(),
            api_key: String::new(),
            convert: "USD".to_string(),
            refresh_interval_ms: 5_000,
            min_refetch_gap_ms: 60_000,
            classes: vec![InstrumentClass::Crypto],
        }
    }
}

impl SnapshotFeedConfig {
    /// Multiplexer policy for this provider.
    #[must_use]
    pub const fn policy(&self) -> SourcePolicy {
        policy(self.refresh_interval_ms, self.min_refetch_gap_ms)
    }

    /// Minimum time between two batch fetches.
    #[must_use]
    pub const fn batch_gap(&self) -> Duration {
        Duration::from_millis(self.min_refetch_gap_ms)
    }
}

/// Synthetic quote generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticFeedConfig {
    /// Must stay true: the generator is the last-resort source.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seed mixed into every symbol's walk.
    #[serde(default)]
    pub seed: u64,
    /// Half-spread as a fraction of price.
    #[serde(default = "default_spread_fraction")]
    pub spread_fraction: f64,
    /// Poll cadence, milliseconds.
    #[serde(default = "default_synthetic_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Minimum time between two steps of one symbol, milliseconds.
    #[serde(default = "default_synthetic_interval_ms")]
    pub min_refetch_gap_ms: u64,
}

impl Default for SyntheticFeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: 0,
            spread_fraction: default_spread_fraction(),
            refresh_interval_ms: default_synthetic_interval_ms(),
            min_refetch_gap_ms: default_synthetic_interval_ms(),
        }
    }
}

impl SyntheticFeedConfig {
    /// Multiplexer policy for the generator.
    #[must_use]
    pub const fn policy(&self) -> SourcePolicy {
        policy(self.refresh_interval_ms, self.min_refetch_gap_ms)
    }
}

const fn policy(refresh_interval_ms: u64, min_refetch_gap_ms: u64) -> SourcePolicy {
    SourcePolicy {
        refresh_interval: Duration::from_millis(refresh_interval_ms),
        min_refetch_gap: Duration::from_millis(min_refetch_gap_ms),
    }
}

const fn default_true() -> bool {
    true
}

const fn default_spread_fraction() -> f64 {
    0.0002
}

const fn default_synthetic_interval_ms() -> u64 {
    1_000
}
