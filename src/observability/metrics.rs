//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define server and operator metrics
//! - Expose a Prometheus-compatible scrape endpoint when configured
//!
//! # Metrics
//! - `static_requests_total` (counter): dispatched requests by status
//! - `static_reloads_total` (counter): source syncs by source and result
//! - `static_endpoints_loaded` (gauge): paths in the live table
//! - `static_reconciliations_total` (counter): reconciles by kind and result
//!
//! # Design Decisions
//! - Low-overhead metric updates through the `metrics` facade
//! - Without an installed recorder every update is a no-op

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(address: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()?;

    tracing::info!(address = %address, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(status: u16) {
    metrics::counter!("static_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_reload(source: &'static str, result: &'static str) {
    metrics::counter!("static_reloads_total", "source" => source, "result" => result).increment(1);
}

pub fn set_endpoints_loaded(count: usize) {
    metrics::gauge!("static_endpoints_loaded").set(count as f64);
}

pub fn record_reconcile(kind: &'static str, result: &'static str) {
    metrics::counter!("static_reconciliations_total", "kind" => kind, "result" => result).increment(1);
}
