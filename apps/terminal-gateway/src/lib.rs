// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Terminal Gateway - Rust Core Library
//!
//! Market-data and order-management gateway between a charting/trading
//! front-end and a trading ledger backend.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Pure types and algorithms
//!   - `market_data`: quotes, bars, resolutions, instrument catalog, bar
//!     aggregation, synthetic random walks
//!   - `trading`: canonical orders, positions, account state, order status
//!     state machine
//!
//! - **Application**: Ports and services
//!   - `ports`: `DatafeedApi`, `BrokerApi` (driver); quote sources, ledger,
//!     bar store, push channel (driven)
//!   - `services`: quote multiplexer, subscription registry, history,
//!     broker state adapter, order command gateway
//!
//! - **Infrastructure**: Adapters
//!   - `backend`: REST ledger and bar store
//!   - `quote_sources`: live, snapshot and synthetic quote providers
//!   - `persistence`: in-memory paper ledger
//!   - `realtime`: broadcast push price channel
//!   - `http`: axum REST API
//!   - `container`: dependency wiring

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core types with no I/O.
pub mod domain;

/// Application layer - Services and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// Configuration loading and validation.
pub mod config;

/// Command error taxonomy.
pub mod error;

/// Logging and metrics.
pub mod observability;

// =============================================================================
// Re-exports
// =============================================================================

pub use application::ports::{BrokerApi, DatafeedApi};
pub use application::services::{BrokerService, DatafeedService};
pub use config::{Config, ConfigError, load_config, load_config_from_string};
pub use domain::market_data::{Bar, Instrument, InstrumentCatalog, QuoteTick, Resolution};
pub use domain::shared::{AccountId, OrderId, PositionId, SubscriberId, Symbol};
pub use error::GatewayError;
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::{Container, ContainerError};
