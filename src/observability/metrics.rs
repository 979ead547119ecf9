//! Metrics collection and exposition.
//!
//! # Metrics
//! - `serverpool_items_started_total` (counter): start tasks launched, by item
//! - `serverpool_start_failures_total` (counter): failed starts, by item
//! - `serverpool_stop_total` (counter): stop outcomes, by item and outcome
//! - `serverpool_stop_duration_seconds` (histogram): time to stop, by item
//! - `serverpool_ready` (gauge): 1=ready, 0=not ready
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return a handle for rendering.
///
/// The recorder is process global; call once from `main`.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

pub fn record_item_started(item: &str) {
    counter!("serverpool_items_started_total", "item" => item.to_string()).increment(1);
}

pub fn record_start_failure(item: &str) {
    counter!("serverpool_start_failures_total", "item" => item.to_string()).increment(1);
}

pub fn record_stop(item: &str, outcome: &'static str, elapsed: Duration) {
    counter!("serverpool_stop_total", "item" => item.to_string(), "outcome" => outcome).increment(1);
    histogram!("serverpool_stop_duration_seconds", "item" => item.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn set_ready(ready: bool) {
    gauge!("serverpool_ready").set(if ready { 1.0 } else { 0.0 });
}
