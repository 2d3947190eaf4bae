//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_events_total` (counter): ingested events by kind, severity
//! - `guard_requests_rejected_total` (counter): rejections by reason
//! - `guard_rate_limited_total` (counter): rate-limited requests
//! - `guard_alerts_total` (counter): alert deliveries by outcome
//! - `guard_tracked_ips` (gauge): per-source records currently retained

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Start the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_event(kind: &'static str, severity: &'static str) {
    counter!("guard_events_total", "kind" => kind, "severity" => severity).increment(1);
}

pub fn record_rejected(reason: &'static str) {
    counter!("guard_requests_rejected_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited() {
    counter!("guard_rate_limited_total").increment(1);
}

pub fn record_alert(outcome: &'static str) {
    counter!("guard_alerts_total", "outcome" => outcome).increment(1);
}

pub fn record_tracked_ips(count: usize) {
    gauge!("guard_tracked_ips").set(count as f64);
}
