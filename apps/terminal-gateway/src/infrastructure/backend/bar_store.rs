//! Bar history from the `market_candles` table and the `candles-engine`
//! function.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

use super::rest_client::{BackendClient, eq};
use super::rows::{CandleRow, ComputedCandles, InstrumentRow};
use crate::application::ports::{BarRange, BarStorePort, StoreError};
use crate::domain::market_data::{Bar, Resolution};
use crate::domain::shared::Symbol;

#[derive(Debug, Serialize)]
struct CandlesRequest<'a> {
    symbol: &'a str,
    interval: &'static str,
    start_date: String,
    end_date: String,
}

/// REST implementation of [`BarStorePort`].
#[derive(Debug)]
pub struct RestBarStore {
    client: BackendClient,
    instrument_ids: Mutex<HashMap<Symbol, String>>,
}

impl RestBarStore {
    /// Bar store over `client`.
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        Self {
            client,
            instrument_ids: Mutex::new(HashMap::new()),
        }
    }

    /// Backend instrument id for `symbol`; found ids are cached.
    async fn instrument_id(&self, symbol: &Symbol) -> Result<Option<String>, StoreError> {
        if let Some(id) = self.instrument_ids.lock().get(symbol) {
            return Ok(Some(id.clone()));
        }

        let rows: Vec<InstrumentRow> = self
            .client
            .select(
                "instruments",
                &[eq("symbol", symbol), ("select", "id".to_string())],
            )
            .await?;
        let id = rows.into_iter().next().map(|row| row.id);
        if let Some(id) = &id {
            self.instrument_ids.lock().insert(symbol.clone(), id.clone());
        }
        Ok(id)
    }
}

fn iso(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn date(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}

#[async_trait]
impl BarStorePort for RestBarStore {
    async fn stored_bars(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
        range: BarRange,
        limit: usize,
    ) -> Result<Vec<Bar>, StoreError> {
        let Some(instrument_id) = self.instrument_id(symbol).await? else {
            tracing::debug!(symbol = %symbol, "No backend instrument, skipping stored bars");
            return Ok(Vec::new());
        };

        let rows: Vec<CandleRow> = self
            .client
            .select(
                "market_candles",
                &[
                    eq("instrument_id", &instrument_id),
                    eq("timeframe", resolution.timeframe()),
                    ("ts_open", format!("gte.{}", iso(range.from))),
                    ("ts_open", format!("lt.{}", iso(range.to))),
                    ("order", "ts_open.asc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Bar::from).collect())
    }

    async fn compute_bars(
        &self,
        symbol: &Symbol,
        resolution: Resolution,
        range: BarRange,
    ) -> Result<Vec<Bar>, StoreError> {
        let body = CandlesRequest {
            symbol: symbol.as_str(),
            interval: resolution.timeframe(),
            start_date: date(range.from),
            end_date: date(range.to),
        };
        let response: ComputedCandles = self.client.invoke("candles-engine", &body).await?;
        response
            .candles
            .into_iter()
            .map(Bar::try_from)
            .collect()
    }
}
