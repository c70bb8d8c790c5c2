//! Batched REST price snapshot provider.
//!
//! One request prices every supported symbol:
//! `GET {base}/v1/cryptocurrency/quotes/latest?symbol=BTC,ETH&convert=USD`
//! answers `{data: {BTC: {quote: {USD: {price}}}}}`. Prices are keyed by base
//! asset; bid and ask are synthesized around the mid. A fetched batch is
//! reused for `batch_gap`, the provider's rate window.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::application::ports::{QuoteSourceError, QuoteSourcePort};
use crate::domain::market_data::{Instrument, InstrumentCatalog, InstrumentClass, QuoteTick};
use crate::domain::shared::Symbol;

/// Half-spread applied around snapshot mids.
const SPREAD_FRACTION: Decimal = dec!(0.00025);

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    data: HashMap<String, AssetEntry>,
}

#[derive(Debug, Deserialize)]
struct AssetEntry {
    quote: HashMap<String, PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    price: Option<Decimal>,
}

#[derive(Debug)]
struct Batch {
    fetched_at: Instant,
    mids: HashMap<String, Decimal>,
}

/// Batched snapshot quote source.
pub struct SnapshotQuoteSource {
    client: Client,
    base_url: String,
    api_key: String,
    convert: String,
    classes: Vec<InstrumentClass>,
    catalog: Arc<InstrumentCatalog>,
    batch_gap: Duration,
    batch: Mutex<Option<Batch>>,
}

impl SnapshotQuoteSource {
    /// Source for `classes` of `catalog`, served from `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `QuoteSourceError::Http` if the HTTP client cannot be built.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        base_url: &str,
        api_key: &str,
        convert: &str,
        classes: Vec<InstrumentClass>,
        catalog: Arc<InstrumentCatalog>,
        batch_gap: Duration,
        timeout: Duration,
    ) -> Result<Self, QuoteSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteSourceError::Http {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            convert: convert.to_uppercase(),
            classes,
            catalog,
            batch_gap,
            batch: Mutex::new(None),
        })
    }

    fn assets(&self) -> Vec<String> {
        let mut assets: Vec<String> = self
            .catalog
            .iter()
            .filter(|i| self.classes.contains(&i.class))
            .map(|i| i.symbol.base_asset().to_string())
            .collect();
        assets.sort();
        assets.dedup();
        assets
    }

    fn cached_mid(&self, asset: &str) -> Option<Decimal> {
        self.batch
            .lock()
            .as_ref()
            .filter(|batch| batch.fetched_at.elapsed() < self.batch_gap)
            .and_then(|batch| batch.mids.get(asset).copied())
    }

    async fn refresh(&self) -> Result<HashMap<String, Decimal>, QuoteSourceError> {
        let url = format!("{}/v1/cryptocurrency/quotes/latest", self.base_url);
        let symbols = self.assets().join(",");
        let response = self
            .client
            .get(&url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .query(&[("symbol", symbols.as_str()), ("convert", self.convert.as_str())])
            .send()
            .await
            .map_err(|e| QuoteSourceError::Http {
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(QuoteSourceError::RateLimited),
            status if !status.is_success() => {
                return Err(QuoteSourceError::Http {
                    message: format!("snapshot answered {status}"),
                });
            }
            _ => {}
        }

        let body: SnapshotResponse =
            response.json().await.map_err(|e| QuoteSourceError::Decode {
                message: e.to_string(),
            })?;
        let mids: HashMap<String, Decimal> = body
            .data
            .into_iter()
            .filter_map(|(asset, entry)| {
                entry
                    .quote
                    .get(&self.convert)
                    .and_then(|p| p.price)
                    .map(|price| (asset.to_uppercase(), price))
            })
            .collect();

        tracing::debug!(assets = mids.len(), "Snapshot prices refreshed");
        *self.batch.lock() = Some(Batch {
            fetched_at: Instant::now(),
            mids: mids.clone(),
        });
        Ok(mids)
    }

    fn tick(symbol: &Symbol, mid: Decimal) -> QuoteTick {
        QuoteTick::around(symbol.clone(), mid, SPREAD_FRACTION, Utc::now())
    }
}

#[async_trait]
impl QuoteSourcePort for SnapshotQuoteSource {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn supports(&self, instrument: &Instrument) -> bool {
        self.classes.contains(&instrument.class)
    }

    async fn fetch_quote(&self, instrument: &Instrument) -> Result<QuoteTick, QuoteSourceError> {
        let asset = instrument.symbol.base_asset();
        if let Some(mid) = self.cached_mid(asset) {
            return Ok(Self::tick(&instrument.symbol, mid));
        }

        let mids = self.refresh().await?;
        mids.get(asset)
            .map(|mid| Self::tick(&instrument.symbol, *mid))
            .ok_or_else(|| QuoteSourceError::Empty {
                symbol: instrument.symbol.to_string(),
            })
    }
}
