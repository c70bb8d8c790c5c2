//! Row shapes of the backend tables and their mapping onto ledger records.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::application::ports::{AccountRecord, OrderRecord, PositionRecord, StoreError};
use crate::domain::market_data::Bar;

/// Ids arrive as UUID strings or integers.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected id: {other}"))),
    }
}

fn opt_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("unexpected id: {other}"))),
    }
}

/// `user_accounts` row.
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccountRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// `user_wallets` row.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletRow {
    pub balance: Decimal,
    #[serde(default)]
    pub realized_pnl: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Merge an account row with its wallet.
#[must_use]
pub fn account_record(account: UserAccountRow, wallet: Option<&WalletRow>) -> AccountRecord {
    AccountRecord {
        id: account.id,
        name: account.name,
        currency: account
            .currency
            .or_else(|| wallet.and_then(|w| w.currency.clone())),
        balance: wallet.map_or(Decimal::ZERO, |w| w.balance),
        realized_pnl: wallet.and_then(|w| w.realized_pnl),
        account_type: account.account_type,
    }
}

/// `positions` row.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    pub symbol: String,
    pub side: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub realized_pnl: Option<Decimal>,
    #[serde(default)]
    pub leverage: Option<Decimal>,
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    #[serde(default)]
    pub take_profit: Option<Decimal>,
}

impl PositionRow {
    /// Ledger record for this row.
    #[must_use]
    pub fn into_record(self, account_id: &str) -> PositionRecord {
        PositionRecord {
            id: self.id,
            account_id: self.account_id.unwrap_or_else(|| account_id.to_string()),
            symbol: self.symbol,
            side: self.side,
            quantity: self.quantity,
            entry_price: self.average_price,
            current_price: self.current_price,
            realized_pnl: self.realized_pnl,
            leverage: self.leverage,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
        }
    }
}

/// `orders` row.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub account_id: Option<String>,
    pub symbol: String,
    pub side: String,
    #[serde(default)]
    pub order_type: Option<String>,
    pub status: String,
    pub quantity: Decimal,
    /// Limit price.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    #[serde(default)]
    pub filled_quantity: Option<Decimal>,
    #[serde(default)]
    pub average_fill_price: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    /// Ledger record for this row.
    #[must_use]
    pub fn into_record(self, account_id: &str) -> OrderRecord {
        OrderRecord {
            id: self.id,
            account_id: self.account_id.unwrap_or_else(|| account_id.to_string()),
            symbol: self.symbol,
            side: self.side,
            order_type: self.order_type.unwrap_or_else(|| "market".to_string()),
            status: self.status,
            quantity: self.quantity,
            limit_price: self.price,
            stop_price: self.stop_price,
            filled_quantity: self.filled_quantity,
            average_fill_price: self.average_fill_price,
            parent_id: self.parent_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// New `orders` row.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrderRow<'a> {
    pub user_id: &'a str,
    pub account_id: &'a str,
    pub symbol: &'a str,
    pub side: &'static str,
    pub order_type: &'static str,
    pub status: &'static str,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub leverage: Decimal,
    pub reference_price: Decimal,
    pub parent_id: Option<&'a str>,
    pub position_id: Option<&'a str>,
}

/// `instruments` row, only the id is read.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentRow {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
}

/// `market_candles` row.
#[derive(Debug, Clone, Deserialize)]
pub struct CandleRow {
    pub ts_open: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Option<Decimal>,
}

impl From<CandleRow> for Bar {
    fn from(row: CandleRow) -> Self {
        Self {
            time: row.ts_open.timestamp(),
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.unwrap_or_default(),
        }
    }
}

/// Response of the `candles-engine` function.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputedCandles {
    #[serde(default)]
    pub candles: Vec<ComputedCandle>,
}

/// One computed candle; prices may arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputedCandle {
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub ts_open: Option<String>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(default)]
    pub volume: Option<Decimal>,
}

impl TryFrom<ComputedCandle> for Bar {
    type Error = StoreError;

    fn try_from(candle: ComputedCandle) -> Result<Self, Self::Error> {
        let raw = candle
            .datetime
            .as_deref()
            .or(candle.ts_open.as_deref())
            .ok_or_else(|| StoreError::Decode {
                message: "candle without timestamp".to_string(),
            })?;
        Ok(Self {
            time: parse_timestamp(raw)?,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume.unwrap_or_default(),
        })
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare date.
fn parse_timestamp(raw: &str) -> Result<i64, StoreError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.timestamp());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc().timestamp())
        .ok_or_else(|| StoreError::Decode {
            message: format!("unparseable candle time: {raw}"),
        })
}
