//! In-process push price channel.
//!
//! Publishers (the backend realtime bridge, the paper ledger's price feed,
//! tests) send ticks into one broadcast channel; every listener receives the
//! ticks for its own symbol. Listeners that fall behind skip the lagged ticks
//! rather than block the publisher.

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::application::ports::PriceChannelPort;
use crate::domain::market_data::QuoteTick;
use crate::domain::shared::Symbol;

/// Broadcast-backed [`PriceChannelPort`].
#[derive(Debug, Clone)]
pub struct BroadcastPriceChannel {
    sender: broadcast::Sender<QuoteTick>,
}

impl BroadcastPriceChannel {
    /// Channel buffering up to `capacity` ticks per listener.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Push a tick to every listener of its symbol. Returns the number of
    /// listeners attached to the channel.
    pub fn publish(&self, tick: QuoteTick) -> usize {
        self.sender.send(tick).unwrap_or(0)
    }

    /// Listeners attached to the channel.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl PriceChannelPort for BroadcastPriceChannel {
    fn listen(&self, symbol: &Symbol) -> BoxStream<'static, QuoteTick> {
        let symbol = symbol.clone();
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(move |item| {
                let tick = match item {
                    Ok(tick) if tick.symbol == symbol => Some(tick),
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(%symbol, skipped, "Price listener lagged");
                        None
                    }
                };
                futures::future::ready(tick)
            })
            .boxed()
    }
}
