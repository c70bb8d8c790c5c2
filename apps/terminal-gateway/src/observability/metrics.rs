//! Prometheus metrics for the gateway.
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter, so the
//! library and its tests can call these freely.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Error type for metrics operations.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Failed to configure metrics exporter.
    #[error("metrics configuration error: {0}")]
    Configuration(String),
    /// Failed to install metrics exporter.
    #[error("metrics installation error: {0}")]
    Installation(String),
}

/// Latency buckets from 1ms to 10s.
const LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Start the Prometheus exporter on `listen_addr` (`/metrics`).
pub fn init_metrics(listen_addr: SocketAddr) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .set_buckets(LATENCY_BUCKETS)
        .map_err(|e| MetricsError::Configuration(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    tracing::info!(addr = %listen_addr, "Prometheus metrics exporter started");
    Ok(())
}

// ============================================================================
// Market Data Metrics
// ============================================================================

/// Record one quote source attempt.
///
/// * `source` - Source name (e.g., "live", "snapshot", "synthetic")
/// * `outcome` - "ok", "cached", "error" or "invalid"
pub fn record_quote_fetch(source: &str, outcome: &'static str, latency_seconds: f64) {
    counter!(
        "quote_fetches_total",
        "source" => source.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!("quote_fetch_latency_seconds", "source" => source.to_string())
        .record(latency_seconds);
}

/// Record a quote served by something other than the primary source.
pub fn record_quote_fallback(served_by: &str) {
    counter!("quote_fallbacks_total", "served_by" => served_by.to_string()).increment(1);
}

/// Record a realtime bar delivered to a subscriber.
///
/// * `mode` - "poll" or "push"
pub fn record_bar_delivery(mode: &'static str, is_new_bar: bool) {
    counter!(
        "bar_deliveries_total",
        "mode" => mode,
        "new_bar" => if is_new_bar { "true" } else { "false" }
    )
    .increment(1);
}

/// Record which tier answered a history request.
///
/// * `tier` - "stored", "computed", "synthetic" or "empty"
pub fn record_history_source(tier: &'static str, bars: usize) {
    counter!("history_requests_total", "tier" => tier).increment(1);
    histogram!("history_bars_returned", "tier" => tier).record(bars as f64);
}

// ============================================================================
// Order Command Metrics
// ============================================================================

/// Record a trading command.
///
/// * `command` - "place", "modify", "cancel", "close" or "reverse"
/// * `outcome` - "ok", "noop", "rejected" or "error"
pub fn record_order_command(command: &'static str, outcome: &'static str, latency_seconds: f64) {
    counter!(
        "order_commands_total",
        "command" => command,
        "outcome" => outcome
    )
    .increment(1);

    histogram!("order_command_latency_seconds", "command" => command).record(latency_seconds);
}
