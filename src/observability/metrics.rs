//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resource_cache_lookups_total` (counter): cache probes by result (hit, miss, expired)
//! - `resource_cache_entries` (gauge): live entry count
//! - `resource_fetch_attempts_total` (counter): producer invocations
//! - `resource_fetch_outcomes_total` (counter): terminal outcomes by kind
//! - `resource_fetch_duration_seconds` (histogram): time from sequence start to outcome

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_cache_lookup(result: &'static str) {
    ::metrics::counter!("resource_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    ::metrics::gauge!("resource_cache_entries").set(size as f64);
}

pub fn record_fetch_attempt() {
    ::metrics::counter!("resource_fetch_attempts_total").increment(1);
}

/// Record a terminal outcome and how long the sequence took.
pub fn record_fetch_outcome(outcome: &'static str, elapsed: Duration) {
    ::metrics::counter!("resource_fetch_outcomes_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("resource_fetch_duration_seconds", "outcome" => outcome)
        .record(elapsed.as_secs_f64());
}
