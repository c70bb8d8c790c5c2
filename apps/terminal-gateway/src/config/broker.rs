//! Broker defaults.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::services::BrokerSettings;
use crate::domain::shared::AccountId;

/// Account defaults and snapshot cache policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Balance reported when the ledger cannot be read.
    #[serde(default = "default_balance")]
    pub default_balance: Decimal,
    /// Margin level reported while no margin is used.
    #[serde(default = "default_margin_level_sentinel")]
    pub margin_level_sentinel: Decimal,
    /// Snapshot cache lifetime in milliseconds.
    #[serde(default = "default_snapshot_ttl_ms")]
    pub snapshot_ttl_ms: u64,
    /// Leverage for positions of unknown instruments.
    #[serde(default = "default_leverage")]
    pub default_leverage: Decimal,
    /// Id of the fallback account.
    #[serde(default = "default_account_id")]
    pub account_id: String,
    /// Account display name.
    #[serde(default = "default_account_name")]
    pub account_name: String,
    /// Broker display name.
    #[serde(default = "default_broker_name")]
    pub broker_name: String,
    /// Account currency.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Currency sign.
    #[serde(default = "default_currency_sign")]
    pub currency_sign: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_balance: default_balance(),
            margin_level_sentinel: default_margin_level_sentinel(),
            snapshot_ttl_ms: default_snapshot_ttl_ms(),
            default_leverage: default_leverage(),
            account_id: default_account_id(),
            account_name: default_account_name(),
            broker_name: default_broker_name(),
            currency: default_currency(),
            currency_sign: default_currency_sign(),
        }
    }
}

impl BrokerConfig {
    /// Settings for the broker state adapter.
    #[must_use]
    pub fn settings(&self) -> BrokerSettings {
        BrokerSettings {
            default_balance: self.default_balance,
            margin_level_sentinel: self.margin_level_sentinel,
            snapshot_ttl: Duration::from_millis(self.snapshot_ttl_ms),
            default_leverage: self.default_leverage,
            default_account_id: AccountId::new(&self.account_id),
            account_name: self.account_name.clone(),
            broker_name: self.broker_name.clone(),
            currency: self.currency.clone(),
            currency_sign: self.currency_sign.clone(),
        }
    }
}

fn default_balance() -> Decimal {
    Decimal::from(100_000)
}

const fn default_margin_level_sentinel() -> Decimal {
    Decimal::ONE_HUNDRED
}

const fn default_snapshot_ttl_ms() -> u64 {
    2_000
}

const fn default_leverage() -> Decimal {
    Decimal::ONE
}

fn default_account_id() -> String {
    "demo".to_string()
}

fn default_account_name() -> String {
    "TradeArena Trading Account".to_string()
}

fn default_broker_name() -> String {
    "TradeArena".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_currency_sign() -> String {
    "$".to_string()
}
