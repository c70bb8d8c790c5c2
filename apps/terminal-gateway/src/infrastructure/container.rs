//! Dependency Injection Container
//!
//! Builds the quote sources, ledger adapters and services from [`Config`]
//! and wires them together. An empty backend URL selects the in-memory
//! paper ledger; otherwise the REST adapters talk to the configured backend.

use std::sync::Arc;

use thiserror::Error;

use crate::application::ports::{
    BarStorePort, PriceChannelPort, QuoteSourceError, RecordStorePort, StoreError,
};
use crate::application::services::{
    BrokerService, BrokerStateAdapter, DatafeedService, HistoryService, LastQuoteCache,
    OrderCommandGateway, QuoteBoard, QuoteMultiplexer, SubscriptionRegistry,
};
use crate::config::Config;
use crate::domain::market_data::InstrumentCatalog;
use crate::domain::shared::AccountId;
use crate::infrastructure::backend::{BackendClient, RestBarStore, RestRecordStore};
use crate::infrastructure::http::AppState;
use crate::infrastructure::persistence::InMemoryRecordStore;
use crate::infrastructure::quote_sources::{
    LiveQuoteSource, SnapshotQuoteSource, SyntheticQuoteSource,
};
use crate::infrastructure::realtime::BroadcastPriceChannel;

/// Failure while building the container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The backend client could not be built.
    #[error("Backend setup failed: {0}")]
    Backend(#[from] StoreError),

    /// A quote source could not be built.
    #[error("Quote source setup failed: {0}")]
    QuoteSource(#[from] QuoteSourceError),
}

/// Wired gateway.
pub struct Container {
    catalog: Arc<InstrumentCatalog>,
    last_quotes: Arc<LastQuoteCache>,
    multiplexer: Arc<QuoteMultiplexer>,
    registry: Arc<SubscriptionRegistry>,
    datafeed: Arc<DatafeedService>,
    broker: Arc<BrokerService>,
    prices: Arc<BroadcastPriceChannel>,
    paper_ledger: Option<Arc<InMemoryRecordStore>>,
}

impl Container {
    /// Build every component from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError` if an HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ContainerError> {
        let catalog = Arc::new(config.catalog());
        let last_quotes = Arc::new(LastQuoteCache::new());
        let multiplexer = Arc::new(create_multiplexer(config, &catalog, &last_quotes)?);
        let board = Arc::new(QuoteBoard::new(Arc::clone(&multiplexer)));

        let prices = Arc::new(BroadcastPriceChannel::new(
            config.subscriptions.push_channel_capacity,
        ));
        let channel = config
            .subscriptions
            .push_enabled
            .then(|| Arc::clone(&prices) as Arc<dyn PriceChannelPort>);
        let registry = Arc::new(SubscriptionRegistry::new(
            Arc::clone(&multiplexer),
            Arc::clone(&board),
            channel,
            config.subscriptions.settings(),
        ));

        let (store, bar_store, paper_ledger) = create_ledger(config)?;
        let history = Arc::new(HistoryService::new(
            bar_store,
            Arc::clone(&last_quotes),
            config.history.settings(),
        ));
        let datafeed = Arc::new(DatafeedService::new(
            Arc::clone(&catalog),
            history,
            Arc::clone(&registry),
            board,
        ));

        let state = Arc::new(BrokerStateAdapter::new(
            Arc::clone(&store),
            Arc::clone(&catalog),
            Arc::clone(&last_quotes),
            config.broker.settings(),
        ));
        let gateway = Arc::new(OrderCommandGateway::new(
            store,
            Arc::clone(&state),
            Arc::clone(&multiplexer),
        ));
        let broker = Arc::new(BrokerService::new(state, gateway));

        tracing::info!(
            instruments = catalog.len(),
            sources = ?multiplexer.source_names(),
            paper = paper_ledger.is_some(),
            push = config.subscriptions.push_enabled,
            "Gateway wired"
        );

        Ok(Self {
            catalog,
            last_quotes,
            multiplexer,
            registry,
            datafeed,
            broker,
            prices,
            paper_ledger,
        })
    }

    /// Instrument catalog.
    pub fn catalog(&self) -> Arc<InstrumentCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Last-known quote cache.
    pub fn last_quotes(&self) -> Arc<LastQuoteCache> {
        Arc::clone(&self.last_quotes)
    }

    /// Quote multiplexer.
    pub fn multiplexer(&self) -> Arc<QuoteMultiplexer> {
        Arc::clone(&self.multiplexer)
    }

    /// Subscription registry.
    pub fn registry(&self) -> Arc<SubscriptionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Datafeed service.
    pub fn datafeed(&self) -> Arc<DatafeedService> {
        Arc::clone(&self.datafeed)
    }

    /// Broker service.
    pub fn broker(&self) -> Arc<BrokerService> {
        Arc::clone(&self.broker)
    }

    /// Push price channel.
    pub fn prices(&self) -> Arc<BroadcastPriceChannel> {
        Arc::clone(&self.prices)
    }

    /// The paper ledger, when no backend is configured.
    pub fn paper_ledger(&self) -> Option<Arc<InMemoryRecordStore>> {
        self.paper_ledger.clone()
    }

    /// HTTP handler state.
    pub fn app_state(&self, version: impl Into<String>) -> AppState {
        AppState {
            datafeed: self.datafeed(),
            broker: self.broker(),
            registry: self.registry(),
            prices: self.prices(),
            last_quotes: self.last_quotes(),
            version: version.into(),
        }
    }

    /// Stop every realtime subscription.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}

/// Quote sources in priority order: live, snapshot, with the synthetic
/// generator as the fallback tier.
fn create_multiplexer(
    config: &Config,
    catalog: &Arc<InstrumentCatalog>,
    last_quotes: &Arc<LastQuoteCache>,
) -> Result<QuoteMultiplexer, ContainerError> {
    let feeds = &config.feeds;
    let timeout = config.backend.timeout();
    let mut multiplexer = QuoteMultiplexer::new(Arc::clone(catalog), Arc::clone(last_quotes));

    if feeds.live.enabled {
        let source = LiveQuoteSource::new(
            &feeds.live.url,
            &feeds.live.api_key,
            feeds.live.classes.clone(),
            timeout,
        )?;
        multiplexer = multiplexer.with_source(Arc::new(source), feeds.live.policy());
    }

    if feeds.snapshot.enabled {
        let source = SnapshotQuoteSource::new(
            &feeds.snapshot.url,
            &feeds.snapshot.api_key,
            &feeds.snapshot.convert,
            feeds.snapshot.classes.clone(),
            Arc::clone(catalog),
            feeds.snapshot.batch_gap(),
            timeout,
        )?;
        multiplexer = multiplexer.with_source(Arc::new(source), feeds.snapshot.policy());
    }

    let synthetic = SyntheticQuoteSource::new(feeds.synthetic.seed, feeds.synthetic.spread_fraction);
    Ok(multiplexer.with_fallback(Arc::new(synthetic), feeds.synthetic.policy()))
}

type Ledger = (
    Arc<dyn RecordStorePort>,
    Option<Arc<dyn BarStorePort>>,
    Option<Arc<InMemoryRecordStore>>,
);

/// REST adapters for a configured backend, the paper ledger otherwise.
fn create_ledger(config: &Config) -> Result<Ledger, ContainerError> {
    if config.backend.is_paper() {
        let paper = Arc::new(InMemoryRecordStore::with_account(
            &AccountId::new(&config.broker.account_id),
            &config.broker.account_name,
            config.broker.default_balance,
        ));
        tracing::info!(account = %config.broker.account_id, "Using paper ledger");
        return Ok((
            Arc::clone(&paper) as Arc<dyn RecordStorePort>,
            None,
            Some(paper),
        ));
    }

    let client = BackendClient::new(
        &config.backend.url,
        &config.backend.api_key,
        config.backend.timeout(),
        config.backend.retry.policy(),
    )?;
    tracing::info!(url = %config.backend.url, "Using backend ledger");
    Ok((
        Arc::new(RestRecordStore::new(client.clone(), &config.backend.user_id)),
        Some(Arc::new(RestBarStore::new(client))),
        None,
    ))
}
