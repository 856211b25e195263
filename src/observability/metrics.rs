//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fridge_requests_total` (counter): requests by method, outcome, status
//! - `fridge_request_duration_seconds` (histogram): dispatch latency
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the Prometheus exporter is
//!   installed by `main` only, so tests record into a no-op
//! - Bodies rejected before dispatch are counted under outcome `rejected`

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::routing::Outcome;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a dispatched request.
pub fn record_dispatch(method: &str, outcome: Outcome, status: u16, start: Instant) {
    record(method, outcome.as_str(), status, start);
}

/// Record a request rejected before dispatch.
pub fn record_rejected(method: &str, status: u16, start: Instant) {
    record(method, "rejected", status, start);
}

fn record(method: &str, outcome: &'static str, status: u16, start: Instant) {
    ::metrics::counter!(
        "fridge_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "fridge_request_duration_seconds",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .record(start.elapsed().as_secs_f64());
}
