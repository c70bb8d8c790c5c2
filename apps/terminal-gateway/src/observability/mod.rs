//! Observability: tracing subscriber setup and Prometheus metrics.

mod metrics;
mod tracing_setup;

pub use metrics::{
    MetricsError, init_metrics, record_bar_delivery, record_history_source,
    record_order_command, record_quote_fallback, record_quote_fetch,
};
pub use tracing_setup::init_tracing;
