//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_attempts_total` (counter): attempts by outcome
//! - `relay_jobs_total` (counter): finished jobs by outcome
//! - `relay_job_duration_seconds` (histogram): wall time of a job, retries included
//! - `relay_http_requests_total` (counter): inbound requests by route, status
//! - `relay_asset_lookups_total` (counter): offline cache hits and misses
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt(outcome: &'static str) {
    counter!("relay_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_job(outcome: &'static str, started: Option<Instant>) {
    counter!("relay_jobs_total", "outcome" => outcome).increment(1);
    if let Some(started) = started {
        histogram!("relay_job_duration_seconds").record(started.elapsed().as_secs_f64());
    }
}

pub fn record_request(route: &'static str, status: u16) {
    counter!(
        "relay_http_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_asset_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("relay_asset_lookups_total", "result" => result).increment(1);
}
