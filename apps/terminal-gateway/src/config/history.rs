//! Historical bars and realtime subscription cadence.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::services::{HistorySettings, RegistrySettings};

/// Historical bar retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Upper bound on generated bars per request.
    #[serde(default = "default_max_synthetic_bars")]
    pub max_synthetic_bars: usize,
    /// Row limit of stored bar queries.
    #[serde(default = "default_stored_bar_limit")]
    pub stored_bar_limit: usize,
    /// Seed mixed into generated history.
    #[serde(default)]
    pub seed: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_synthetic_bars: default_max_synthetic_bars(),
            stored_bar_limit: default_stored_bar_limit(),
            seed: 0,
        }
    }
}

impl HistoryConfig {
    /// Settings for the history service.
    #[must_use]
    pub const fn settings(&self) -> HistorySettings {
        HistorySettings {
            max_synthetic_bars: self.max_synthetic_bars,
            stored_bar_limit: self.stored_bar_limit,
            seed: self.seed,
        }
    }
}

/// Realtime delivery cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionsConfig {
    /// Lower bound on the bar poll interval, milliseconds.
    #[serde(default = "default_poll_ms")]
    pub bar_poll_interval_ms: u64,
    /// Quote listener poll interval, milliseconds.
    #[serde(default = "default_poll_ms")]
    pub quote_poll_interval_ms: u64,
    /// Buffer of the in-process push channel.
    #[serde(default = "default_push_capacity")]
    pub push_channel_capacity: usize,
    /// Whether pushed prices feed bar subscriptions.
    #[serde(default = "default_push_enabled")]
    pub push_enabled: bool,
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            bar_poll_interval_ms: default_poll_ms(),
            quote_poll_interval_ms: default_poll_ms(),
            push_channel_capacity: default_push_capacity(),
            push_enabled: default_push_enabled(),
        }
    }
}

impl SubscriptionsConfig {
    /// Settings for the subscription registry.
    #[must_use]
    pub const fn settings(&self) -> RegistrySettings {
        RegistrySettings {
            bar_poll_interval: Duration::from_millis(self.bar_poll_interval_ms),
            quote_poll_interval: Duration::from_millis(self.quote_poll_interval_ms),
        }
    }
}

const fn default_max_synthetic_bars() -> usize {
    500
}

const fn default_stored_bar_limit() -> usize {
    1_000
}

const fn default_poll_ms() -> u64 {
    1_000
}

const fn default_push_capacity() -> usize {
    1_024
}

const fn default_push_enabled() -> bool {
    true
}
