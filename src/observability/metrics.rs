//! Metrics collection and exposition.
//!
//! # Metrics
//! - `anchor_requests_total` (counter): passes by final status
//! - `anchor_request_duration_seconds` (histogram): pass latency
//! - `anchor_failures_total` (counter): translated failures by kind
//!
//! # Design Decisions
//! - The exporter is only installed by `serve` when enabled
//! - Without a recorder every update is discarded

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with its own scrape listener.
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a finished pass.
pub fn record_pass(status: u16, started: Instant) {
    metrics::counter!("anchor_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("anchor_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Record a failure handled by the error translator.
pub fn record_failure(kind: &'static str) {
    metrics::counter!("anchor_failures_total", "kind" => kind).increment(1);
}
