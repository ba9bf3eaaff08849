//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, outcome
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_rate_limited_total` (counter): rejected admissions
//! - `proxy_cache_events_total` (counter): hit / miss / store / evict
//! - `proxy_redirects_total` (counter): redirect decisions
//! - `proxy_upstream_errors_total` (counter): upstream failures by code
//! - `proxy_tracked_entries` (gauge): rows held by each in-memory store
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!("proxy_requests_total", &labels).increment(1);
    histogram!("proxy_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("proxy_rate_limited_total").increment(1);
}

pub fn record_cache_event(event: &'static str) {
    counter!("proxy_cache_events_total", "event" => event).increment(1);
}

pub fn record_redirect(decision: &'static str) {
    counter!("proxy_redirects_total", "decision" => decision).increment(1);
}

pub fn record_upstream_error(code: &'static str) {
    counter!("proxy_upstream_errors_total", "code" => code).increment(1);
}

pub fn record_tracked_entries(store: &'static str, len: usize) {
    gauge!("proxy_tracked_entries", "store" => store).set(len as f64);
}
