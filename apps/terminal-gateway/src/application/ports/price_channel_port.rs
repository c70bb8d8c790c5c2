//! Price Channel Port (Driven Port)
//!
//! Push-style price notifications from the backend's realtime channel.

use futures::stream::BoxStream;

use crate::domain::market_data::QuoteTick;
use crate::domain::shared::Symbol;

/// Port for push price updates.
pub trait PriceChannelPort: Send + Sync {
    /// Stream of updates for one instrument.
    ///
    /// The stream ends when the channel shuts down. Dropping it detaches the
    /// listener.
    fn listen(&self, symbol: &Symbol) -> BoxStream<'static, QuoteTick>;
}
