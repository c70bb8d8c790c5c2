//! Realtime push adapters.

mod broadcast;

pub use broadcast::BroadcastPriceChannel;
