//! Per-symbol REST last-quote provider.
//!
//! `GET {base}/last/stock/{SYMBOL}?apikey=KEY` answers
//! `{symbol, bid, ask, bsize, asize, timestamp}` with a millisecond timestamp.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use crate::application::ports::{QuoteSourceError, QuoteSourcePort};
use crate::domain::market_data::{Instrument, InstrumentClass, QuoteTick};

#[derive(Debug, Deserialize)]
struct LastQuote {
    #[serde(default)]
    bid: Option<Decimal>,
    #[serde(default)]
    ask: Option<Decimal>,
    #[serde(default)]
    bsize: Option<Decimal>,
    #[serde(default)]
    asize: Option<Decimal>,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Live REST quote source.
#[derive(Debug, Clone)]
pub struct LiveQuoteSource {
    client: Client,
    base_url: String,
    api_key: String,
    classes: Vec<InstrumentClass>,
}

impl LiveQuoteSource {
    /// Source for `classes` served from `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `QuoteSourceError::Http` if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        classes: Vec<InstrumentClass>,
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
            classes,
        })
    }
}

#[async_trait]
impl QuoteSourcePort for LiveQuoteSource {
    fn name(&self) -> &str {
        "live"
    }

    fn supports(&self, instrument: &Instrument) -> bool {
        self.classes.contains(&instrument.class)
    }

    async fn fetch_quote(&self, instrument: &Instrument) -> Result<QuoteTick, QuoteSourceError> {
        let url = format!("{}/last/stock/{}", self.base_url, instrument.symbol);
        let response = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| QuoteSourceError::Http {
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(QuoteSourceError::RateLimited),
            status if !status.is_success() => {
                return Err(QuoteSourceError::Http {
                    message: format!("{} answered {status}", instrument.symbol),
                });
            }
            _ => {}
        }

        let quote: LastQuote = response.json().await.map_err(|e| QuoteSourceError::Decode {
            message: e.to_string(),
        })?;
        let (Some(bid), Some(ask)) = (quote.bid, quote.ask) else {
            return Err(QuoteSourceError::Empty {
                symbol: instrument.symbol.to_string(),
            });
        };
        let timestamp = quote
            .timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        tracing::trace!(symbol = %instrument.symbol, %bid, %ask, "Live quote");
        Ok(QuoteTick::new(
            instrument.symbol.clone(),
            bid,
            ask,
            quote.bsize.unwrap_or_default(),
            quote.asize.unwrap_or_default(),
            timestamp,
        ))
    }
}
