//! Metrics collection and exposition.
//!
//! # Metrics
//! - `forwarder_exchanges_total` (counter): exchanges by path (connector, normal)
//! - `forwarder_connector_outcomes_total` (counter): delivered / failed delegations
//! - `forwarder_reports_total` (counter): reports by result (sent, failed, dropped)
//! - `forwarder_upstream_requests_total` (counter): origin responses by status
//! - `forwarder_upstream_duration_seconds` (histogram): origin latency
//! - `forwarder_store_entries` (gauge): stored removed-headers entries
//! - `forwarder_store_evictions_total` (counter): entries expired by the sweeper
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_exchange(path: &'static str) {
    ::metrics::counter!("forwarder_exchanges_total", "path" => path).increment(1);
}

pub fn record_connector_outcome(outcome: &'static str) {
    ::metrics::counter!("forwarder_connector_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_report(result: &'static str) {
    ::metrics::counter!("forwarder_reports_total", "result" => result).increment(1);
}

pub fn record_upstream(status: u16, start: Instant) {
    ::metrics::counter!("forwarder_upstream_requests_total", "status" => status.to_string())
        .increment(1);
    ::metrics::histogram!("forwarder_upstream_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_store_size(entries: usize) {
    ::metrics::gauge!("forwarder_store_entries").set(entries as f64);
}

pub fn record_store_evictions(evicted: usize) {
    ::metrics::counter!("forwarder_store_evictions_total").increment(evicted as u64);
}
