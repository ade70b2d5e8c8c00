//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, backend
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_failovers_total` (counter): reactive evictions by process
//! - `gateway_backends_registered` (gauge): live local handles

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter. Failure to bind is logged, not fatal:
/// the gateway routes fine without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(error) => tracing::error!(%error, "Failed to install metrics exporter"),
    }
}

/// Record a completed (or rejected) request.
pub fn record_request(method: &str, status: u16, backend: &str, start_time: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string(),
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds")
        .record(start_time.elapsed().as_secs_f64());
}

/// Record a failover against a backend process.
pub fn record_failover(process_id: &str) {
    metrics::counter!(
        "gateway_failovers_total",
        "process_id" => process_id.to_string(),
    )
    .increment(1);
}

/// Record the current number of registered backend handles.
pub fn record_backend_count(count: usize) {
    metrics::gauge!("gateway_backends_registered").set(count as f64);
}
