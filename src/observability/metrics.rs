//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by backend class, status
//! - `edge_request_duration_seconds` (histogram): end-to-end latency by backend class
//! - `edge_cache_events_total` (counter): edge cache hit / miss / bypass / store
//! - `edge_upstream_errors_total` (counter): network failures by backend class
//! - `edge_downloads_total` (counter): tracked downloads by registry
//! - `edge_analytics_dropped_total` (counter): events the analytics sink discarded
//!
//! # Design Decisions
//! - Low-overhead metric updates (no-ops until a recorder is installed)
//! - No per-package labels; package identity goes to the analytics sink

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(backend: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "edge_requests_total",
        "backend" => backend,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("edge_request_duration_seconds", "backend" => backend)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache(outcome: &'static str) {
    metrics::counter!("edge_cache_events_total", "outcome" => outcome).increment(1);
}

pub fn record_upstream_error(backend: &'static str) {
    metrics::counter!("edge_upstream_errors_total", "backend" => backend).increment(1);
}

pub fn record_download(registry: &'static str) {
    metrics::counter!("edge_downloads_total", "registry" => registry).increment(1);
}

pub fn record_analytics_dropped() {
    metrics::counter!("edge_analytics_dropped_total").increment(1);
}
