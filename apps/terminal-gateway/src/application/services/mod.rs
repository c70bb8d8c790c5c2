//! Application Services
//!
//! Services coordinate domain logic and the driven ports. The registry runs
//! background delivery tasks; everything else answers one request at a time.

mod broker;
mod broker_state;
mod datafeed;
mod history;
mod last_quote_cache;
mod order_gateway;
mod quote_board;
mod quote_multiplexer;
mod subscription_registry;

pub use broker::BrokerService;
pub use broker_state::{BrokerSettings, BrokerStateAdapter};
pub use datafeed::DatafeedService;
pub use history::{HistoryService, HistorySettings};
pub use last_quote_cache::LastQuoteCache;
pub use order_gateway::OrderCommandGateway;
pub use quote_board::QuoteBoard;
pub use quote_multiplexer::{QuoteMultiplexer, SourcePolicy};
pub use subscription_registry::{RegistrySettings, SubscriptionRegistry};
