//! Subscription Registry
//!
//! Owns every realtime bar and quote listener. Each listener id maps to
//! exactly one delivery task; removing the id aborts the task and waits out
//! any delivery already running, so nothing reaches a callback once
//! `unsubscribe_*` has returned.
//!
//! A bar subscription is fed by its poll timer and, when a push channel is
//! configured, by pushed prices as well. Both go through the same
//! aggregator.

use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{QuoteBoard, QuoteMultiplexer};
use crate::application::ports::{OnQuotes, OnRealtimeBar, PriceChannelPort};
use crate::domain::market_data::{BarAggregator, Instrument, QuoteTick, Resolution};
use crate::domain::shared::SubscriberId;
use crate::observability::record_bar_delivery;

/// Cadence of bar and quote listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Lower bound on the poll interval of bar subscriptions.
    pub bar_poll_interval: Duration,
    /// Poll interval of quote listeners.
    pub quote_poll_interval: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            bar_poll_interval: Duration::from_secs(1),
            quote_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Bar state of one subscription. Delivery holds this lock while the
/// callback runs.
struct BarStream {
    instrument: Instrument,
    aggregator: BarAggregator,
    on_bar: OnRealtimeBar,
    active: bool,
}

impl BarStream {
    fn deliver(&mut self, tick: &QuoteTick, mode: &'static str) {
        if !self.active {
            return;
        }
        if let Some(update) = self.aggregator.apply(tick) {
            tracing::trace!(
                symbol = %self.instrument.symbol,
                time = update.bar.time,
                new_bar = update.is_new_bar,
                "Delivering bar"
            );
            record_bar_delivery(mode, update.is_new_bar);
            (self.on_bar)(update.bar);
        }
    }
}

struct QuoteFeed {
    on_update: OnQuotes,
    active: bool,
}

/// Live handle: shared state plus the single task that feeds it.
struct Listener<S> {
    state: Arc<Mutex<S>>,
    task: JoinHandle<()>,
}

/// Registry of realtime bar and quote listeners.
///
/// Callbacks run while the listener's lock is held; they must not
/// unsubscribe their own id synchronously.
///
/// # Example
///
/// ```ignore
/// let id = registry.subscribe(instrument, Resolution::Minute1, Arc::new(|bar| println!("{bar:?}")));
/// registry.unsubscribe(&id);
/// registry.unsubscribe(&id); // no-op
/// ```
pub struct SubscriptionRegistry {
    multiplexer: Arc<QuoteMultiplexer>,
    board: Arc<QuoteBoard>,
    channel: Option<Arc<dyn PriceChannelPort>>,
    settings: RegistrySettings,
    bars: Mutex<HashMap<SubscriberId, Listener<BarStream>>>,
    quotes: Mutex<HashMap<SubscriberId, Listener<QuoteFeed>>>,
}

impl SubscriptionRegistry {
    /// Registry polling through `multiplexer`, also fed by `channel` when set.
    #[must_use]
    pub fn new(
        multiplexer: Arc<QuoteMultiplexer>,
        board: Arc<QuoteBoard>,
        channel: Option<Arc<dyn PriceChannelPort>>,
        settings: RegistrySettings,
    ) -> Self {
        Self {
            multiplexer,
            board,
            channel,
            settings,
            bars: Mutex::new(HashMap::new()),
            quotes: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe under a fresh id.
    pub fn subscribe(
        &self,
        instrument: Instrument,
        resolution: Resolution,
        on_bar: OnRealtimeBar,
    ) -> SubscriberId {
        let id = SubscriberId::generate();
        self.subscribe_with_id(id.clone(), instrument, resolution, on_bar);
        id
    }

    /// Subscribe under a caller-chosen id, replacing any previous
    /// subscription with that id.
    ///
    /// `instrument` is captured as-is for the life of the subscription.
    pub fn subscribe_with_id(
        &self,
        id: SubscriberId,
        instrument: Instrument,
        resolution: Resolution,
        on_bar: OnRealtimeBar,
    ) {
        self.unsubscribe(&id);

        let interval = self
            .multiplexer
            .poll_interval(&instrument)
            .max(self.settings.bar_poll_interval);
        let state = Arc::new(Mutex::new(BarStream {
            instrument: instrument.clone(),
            aggregator: BarAggregator::new(resolution),
            on_bar,
            active: true,
        }));

        let task = tokio::spawn(feed_bars(
            Arc::clone(&self.multiplexer),
            self.channel.clone(),
            instrument.clone(),
            interval,
            Arc::clone(&state),
        ));

        tracing::info!(
            subscriber = %id,
            symbol = %instrument.symbol,
            resolution = %resolution,
            push = self.channel.is_some(),
            "Bar subscription started"
        );
        self.bars.lock().insert(id, Listener { state, task });
    }

    /// Stop a bar subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: &SubscriberId) {
        let removed = self.bars.lock().remove(id);
        if let Some(listener) = removed {
            listener.task.abort();
            listener.state.lock().active = false;
            tracing::info!(subscriber = %id, "Bar subscription stopped");
        }
    }

    /// Start a quote listener, replacing any previous one with that id.
    pub fn subscribe_quotes(&self, id: SubscriberId, symbols: Vec<String>, on_update: OnQuotes) {
        self.unsubscribe_quotes(&id);

        let state = Arc::new(Mutex::new(QuoteFeed {
            on_update,
            active: true,
        }));
        let task = tokio::spawn(feed_quotes(
            Arc::clone(&self.board),
            symbols.clone(),
            self.settings.quote_poll_interval,
            Arc::clone(&state),
        ));

        tracing::info!(listener = %id, symbols = ?symbols, "Quote subscription started");
        self.quotes.lock().insert(id, Listener { state, task });
    }

    /// Stop a quote listener. Unknown ids are ignored.
    pub fn unsubscribe_quotes(&self, id: &SubscriberId) {
        let removed = self.quotes.lock().remove(id);
        if let Some(listener) = removed {
            listener.task.abort();
            listener.state.lock().active = false;
            tracing::info!(listener = %id, "Quote subscription stopped");
        }
    }

    /// Number of live bar subscriptions.
    #[must_use]
    pub fn bar_subscriptions(&self) -> usize {
        self.bars.lock().len()
    }

    /// Number of live quote listeners.
    #[must_use]
    pub fn quote_subscriptions(&self) -> usize {
        self.quotes.lock().len()
    }

    /// Stop everything.
    pub fn shutdown(&self) {
        let bars: Vec<SubscriberId> = self.bars.lock().keys().cloned().collect();
        for id in &bars {
            self.unsubscribe(id);
        }
        let quotes: Vec<SubscriberId> = self.quotes.lock().keys().cloned().collect();
        for id in &quotes {
            self.unsubscribe_quotes(id);
        }
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn feed_bars(
    multiplexer: Arc<QuoteMultiplexer>,
    channel: Option<Arc<dyn PriceChannelPort>>,
    instrument: Instrument,
    interval: Duration,
    state: Arc<Mutex<BarStream>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut pushed = channel.map(|channel| channel.listen(&instrument.symbol));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(tick) = multiplexer.quote_for(&instrument).await {
                    state.lock().deliver(&tick, "poll");
                }
            }
            update = next_push(&mut pushed) => {
                match update {
                    Some(tick) => {
                        multiplexer.last_quotes().store(tick.clone());
                        state.lock().deliver(&tick, "push");
                    }
                    None => {
                        tracing::warn!(symbol = %instrument.symbol, "Push channel closed, polling only");
                        pushed = None;
                    }
                }
            }
        }
    }
}

async fn next_push(stream: &mut Option<BoxStream<'static, QuoteTick>>) -> Option<QuoteTick> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn feed_quotes(
    board: Arc<QuoteBoard>,
    symbols: Vec<String>,
    interval: Duration,
    state: Arc<Mutex<QuoteFeed>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let snapshots = board.snapshots(&symbols).await;
        let feed = state.lock();
        if feed.active {
            (feed.on_update)(snapshots);
        }
    }
}
