//! Configuration module for the terminal gateway.
//!
//! YAML configuration with `${VAR}` / `${VAR:-default}` environment
//! interpolation. Every section is optional; an empty file runs the gateway
//! in paper mode on the built-in instrument catalog with synthetic quotes.
//!
//! # Usage
//!
//! ```rust,ignore
//! use terminal_gateway::config::load_config;
//!
//! // Load from default path (config/default.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("deploy/gateway.yaml"))?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod backend;
mod broker;
mod feeds;
mod history;
mod observability;
mod server;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backend::{BackendConfig, RetryConfig};
pub use broker::BrokerConfig;
pub use feeds::{FeedsConfig, LiveFeedConfig, SnapshotFeedConfig, SyntheticFeedConfig};
pub use history::{HistoryConfig, SubscriptionsConfig};
pub use observability::{LoggingConfig, MetricsConfig, ObservabilityConfig};
pub use server::ServerConfig;

use crate::domain::market_data::{Instrument, InstrumentCatalog};

/// Path read when no config path is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,
    /// Trading ledger backend. Empty URL selects the paper ledger.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Quote sources.
    #[serde(default)]
    pub feeds: FeedsConfig,
    /// Historical bars.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Realtime subscription cadence.
    #[serde(default)]
    pub subscriptions: SubscriptionsConfig,
    /// Account defaults.
    #[serde(default)]
    pub broker: BrokerConfig,
    /// Instruments added to (or overriding) the built-in catalog.
    #[serde(default)]
    pub instruments: Vec<Instrument>,
    /// Logging and metrics.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Built-in catalog extended with the configured instruments.
    #[must_use]
    pub fn catalog(&self) -> InstrumentCatalog {
        let mut catalog = InstrumentCatalog::builtin();
        catalog.extend(self.instruments.iter().cloned());
        catalog
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to [`DEFAULT_CONFIG_PATH`].
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = if interpolated.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml_bw::from_str(&interpolated)?
    };
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset or empty
/// variables without a default become the empty string.
#[allow(clippy::expect_used)] // Regex is compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let default_value = caps.get(2).map_or("", |m| m.as_str());
        match caps.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(value)) if !value.is_empty() => value,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |message: &str| Err(ConfigError::ValidationError(message.to_string()));

    if !config.backend.is_paper() && config.backend.user_id.trim().is_empty() {
        return invalid("backend.user_id is required when backend.url is set");
    }
    if config.backend.retry.max_attempts == 0 {
        return invalid("backend.retry.max_attempts must be at least 1");
    }
    if config.backend.retry.multiplier < 1.0 {
        return invalid("backend.retry.multiplier must be at least 1.0");
    }

    if config.feeds.live.enabled && config.feeds.live.url.trim().is_empty() {
        return invalid("feeds.live.url is required when the live feed is enabled");
    }
    if config.feeds.snapshot.enabled && config.feeds.snapshot.url.trim().is_empty() {
        return invalid("feeds.snapshot.url is required when the snapshot feed is enabled");
    }
    if !config.feeds.synthetic.enabled {
        return invalid("feeds.synthetic.enabled must be true");
    }
    if !(0.0..0.5).contains(&config.feeds.synthetic.spread_fraction) {
        return invalid("feeds.synthetic.spread_fraction must be in [0, 0.5)");
    }

    if config.history.max_synthetic_bars == 0 {
        return invalid("history.max_synthetic_bars must be positive");
    }
    if config.subscriptions.push_channel_capacity == 0 {
        return invalid("subscriptions.push_channel_capacity must be positive");
    }

    if config.broker.default_balance <= Decimal::ZERO {
        return invalid("broker.default_balance must be positive");
    }
    if config.broker.margin_level_sentinel <= Decimal::ZERO {
        return invalid("broker.margin_level_sentinel must be positive");
    }
    if config.broker.account_id.trim().is_empty() {
        return invalid("broker.account_id must not be empty");
    }

    if let Some(instrument) = config
        .instruments
        .iter()
        .find(|i| i.symbol.is_empty() || i.pricescale == 0)
    {
        return Err(ConfigError::ValidationError(format!(
            "instrument '{}' needs a symbol and a positive pricescale",
            instrument.symbol
        )));
    }

    let format = config.observability.logging.format.as_str();
    if format != "json" && format != "pretty" {
        return invalid("observability.logging.format must be 'json' or 'pretty'");
    }
    if config.observability.metrics.enabled
        && config.observability.metrics.port == config.server.http_port
    {
        return invalid("observability.metrics.port must differ from server.http_port");
    }

    Ok(())
}
