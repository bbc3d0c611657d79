//! Metrics collection and exposition.
//!
//! # Metrics
//! - `locale_redirects_total` (counter): redirects by target locale and primary source
//! - `locale_bot_requests_total` (counter): gated bot requests by reason
//! - `locale_passthrough_total` (counter): requests forwarded to the origin, by reason
//! - `locale_upstream_errors_total` (counter): failed forwards
//! - `locale_decision_duration_seconds` (histogram): engine latency
//! - `locale_analytics_events_total` (counter): events stored, by kind
//! - `locale_analytics_dropped_total` (counter): events lost to a full or closed queue
//! - `locale_analytics_store_size` (gauge): events currently retained
//! - `locale_config_reloads_total` (counter): reload attempts by result

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_redirect(locale: &str, source: &str, decision_time: Duration) {
    metrics::counter!(
        "locale_redirects_total",
        "locale" => locale.to_string(),
        "source" => source.to_string()
    )
    .increment(1);
    metrics::histogram!("locale_decision_duration_seconds").record(decision_time.as_secs_f64());
}

pub fn record_bot_request(reason: &'static str) {
    metrics::counter!("locale_bot_requests_total", "reason" => reason).increment(1);
}

pub fn record_passthrough(reason: &'static str) {
    metrics::counter!("locale_passthrough_total", "reason" => reason).increment(1);
}

pub fn record_upstream_error() {
    metrics::counter!("locale_upstream_errors_total").increment(1);
}

pub fn record_analytics_event(kind: &'static str) {
    metrics::counter!("locale_analytics_events_total", "kind" => kind).increment(1);
}

pub fn record_analytics_dropped() {
    metrics::counter!("locale_analytics_dropped_total").increment(1);
}

pub fn record_store_size(size: usize) {
    metrics::gauge!("locale_analytics_store_size").set(size as f64);
}

pub fn record_config_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("locale_config_reloads_total", "result" => result).increment(1);
}
