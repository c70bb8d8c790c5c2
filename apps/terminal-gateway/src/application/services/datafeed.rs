//! Charting datafeed built from the catalog, history, registry and quote board.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{HistoryService, QuoteBoard, SubscriptionRegistry};
use crate::application::ports::{
    BarRange, DatafeedApi, DatafeedConfiguration, DatafeedError, ExchangeDescriptor,
    HistoryResult, OnQuotes, OnRealtimeBar, PeriodParams, QuoteSnapshot, SymbolDescriptor,
    SymbolInfo, SymbolTypeDescriptor,
};
use crate::domain::market_data::{Instrument, InstrumentCatalog, InstrumentClass, Resolution};
use crate::domain::shared::{SubscriberId, Symbol};

/// [`DatafeedApi`] implementation.
pub struct DatafeedService {
    catalog: Arc<InstrumentCatalog>,
    history: Arc<HistoryService>,
    registry: Arc<SubscriptionRegistry>,
    board: Arc<QuoteBoard>,
}

impl DatafeedService {
    /// Wire the datafeed.
    #[must_use]
    pub const fn new(
        catalog: Arc<InstrumentCatalog>,
        history: Arc<HistoryService>,
        registry: Arc<SubscriptionRegistry>,
        board: Arc<QuoteBoard>,
    ) -> Self {
        Self {
            catalog,
            history,
            registry,
            board,
        }
    }

    /// The subscription registry behind this datafeed.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    fn instrument(&self, name: &str) -> Result<&Instrument, DatafeedError> {
        self.catalog
            .get(&Symbol::new(name))
            .ok_or_else(|| DatafeedError::UnknownSymbol {
                name: name.to_string(),
            })
    }

    fn configuration(&self) -> DatafeedConfiguration {
        let exchanges = self
            .catalog
            .exchanges()
            .into_iter()
            .map(|exchange| ExchangeDescriptor {
                value: exchange.clone(),
                name: exchange.clone(),
                desc: exchange,
            })
            .collect();

        let symbols_types = [
            InstrumentClass::Stock,
            InstrumentClass::Crypto,
            InstrumentClass::Forex,
            InstrumentClass::Commodity,
        ]
        .into_iter()
        .map(|class| SymbolTypeDescriptor {
            name: class.as_str().to_string(),
            value: class.as_str().to_string(),
        })
        .collect();

        DatafeedConfiguration {
            supported_resolutions: Resolution::ALL.to_vec(),
            exchanges,
            symbols_types,
            supports_marks: false,
            supports_timescale_marks: false,
            supports_time: true,
            supports_search: true,
            supports_group_request: false,
        }
    }
}

fn symbol_info(instrument: &Instrument) -> SymbolInfo {
    SymbolInfo {
        name: instrument.symbol.to_string(),
        ticker: instrument.symbol.to_string(),
        description: instrument.description.clone(),
        symbol_type: instrument.class.as_str().to_string(),
        exchange: instrument.exchange.clone(),
        listed_exchange: instrument.exchange.clone(),
        session: instrument.session().to_string(),
        timezone: instrument.timezone().to_string(),
        minmov: 1,
        pricescale: instrument.pricescale,
        has_intraday: true,
        has_daily: true,
        has_weekly_and_monthly: true,
        supported_resolutions: instrument.supported_resolutions(),
        volume_precision: instrument.volume_precision(),
        data_status: "streaming".to_string(),
    }
}

/// Move the start back so the range spans at least `count` buckets.
fn cover_count_back(range: BarRange, resolution: Resolution, count: usize) -> BarRange {
    let span = resolution.seconds().saturating_mul(count as i64);
    let from = range
        .from
        .min(range.to.saturating_sub(span))
        .max(BarRange::EARLIEST);
    BarRange::new(from, range.to)
}

fn parse_class(raw: &str) -> Option<InstrumentClass> {
    match raw.trim().to_lowercase().as_str() {
        "stock" => Some(InstrumentClass::Stock),
        "crypto" => Some(InstrumentClass::Crypto),
        "forex" => Some(InstrumentClass::Forex),
        "commodity" => Some(InstrumentClass::Commodity),
        _ => None,
    }
}

#[async_trait]
impl DatafeedApi for DatafeedService {
    async fn on_ready(&self) -> DatafeedConfiguration {
        tokio::task::yield_now().await;
        self.configuration()
    }

    fn search_symbols(
        &self,
        user_input: &str,
        exchange: &str,
        symbol_type: &str,
    ) -> Vec<SymbolDescriptor> {
        let class = parse_class(symbol_type);
        if class.is_none() && !symbol_type.trim().is_empty() {
            return Vec::new();
        }
        self.catalog
            .search(user_input, Some(exchange), class)
            .into_iter()
            .map(|instrument| SymbolDescriptor {
                symbol: instrument.symbol.to_string(),
                full_name: format!("{}:{}", instrument.exchange, instrument.symbol),
                description: instrument.description.clone(),
                exchange: instrument.exchange.clone(),
                ticker: instrument.symbol.to_string(),
                symbol_type: instrument.class.as_str().to_string(),
            })
            .collect()
    }

    fn resolve_symbol(&self, name: &str) -> Result<SymbolInfo, DatafeedError> {
        self.instrument(name).map(symbol_info)
    }

    async fn get_bars(
        &self,
        symbol_info: &SymbolInfo,
        resolution: Resolution,
        period: PeriodParams,
    ) -> Result<HistoryResult, DatafeedError> {
        let instrument = self.instrument(&symbol_info.ticker)?;
        let requested = BarRange::new(period.from, period.to);
        if period.from > period.to || !requested.is_bounded() {
            return Err(DatafeedError::InvalidRange {
                from: period.from,
                to: period.to,
            });
        }
        let range = match period.count_back {
            Some(count) => {
                cover_count_back(requested, resolution, count.min(self.history.max_bars()))
            }
            None => requested,
        };
        let result = self.history.bars(instrument, resolution, range).await;
        tracing::debug!(
            symbol = %instrument.symbol,
            resolution = %resolution,
            from = range.from,
            to = range.to,
            bars = result.bars.len(),
            "Served history"
        );
        Ok(result)
    }

    fn subscribe_bars(
        &self,
        symbol_info: &SymbolInfo,
        resolution: Resolution,
        on_bar: OnRealtimeBar,
        subscriber_id: SubscriberId,
    ) -> Result<(), DatafeedError> {
        let instrument = self.instrument(&symbol_info.ticker)?;
        if !instrument.supported_resolutions().contains(&resolution) {
            return Err(DatafeedError::UnsupportedResolution {
                resolution: resolution.to_string(),
            });
        }
        self.registry
            .subscribe_with_id(subscriber_id, instrument.clone(), resolution, on_bar);
        Ok(())
    }

    fn unsubscribe_bars(&self, subscriber_id: &SubscriberId) {
        self.registry.unsubscribe(subscriber_id);
    }

    async fn get_quotes(&self, symbols: &[String]) -> Vec<QuoteSnapshot> {
        self.board.snapshots(symbols).await
    }

    fn subscribe_quotes(
        &self,
        symbols: &[String],
        fast_symbols: &[String],
        on_update: OnQuotes,
        listener_id: SubscriberId,
    ) {
        let mut merged: Vec<String> = Vec::with_capacity(symbols.len() + fast_symbols.len());
        for name in symbols.iter().chain(fast_symbols) {
            if !merged.iter().any(|m| Symbol::new(m) == Symbol::new(name)) {
                merged.push(name.clone());
            }
        }
        self.registry.subscribe_quotes(listener_id, merged, on_update);
    }

    fn unsubscribe_quotes(&self, listener_id: &SubscriberId) {
        self.registry.unsubscribe_quotes(listener_id);
    }

    fn server_time(&self) -> i64 {
        Utc::now().timestamp()
    }
}
