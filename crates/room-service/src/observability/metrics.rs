//! Metrics definitions for the room service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `rooms_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `endpoint`: parameterized paths only
//! - `outcome`: bounded by `RoomError::code()` plus `started`, `joined`,
//!   `already_running`
//! - `operation`: conferencing API calls and repository operations
//! - `status`: `success`, `error`, `timeout`, or a server status

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle that renders
/// `/metrics`. Must run before anything is recorded.
///
/// # Errors
///
/// Returns error if a recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("rooms_http_request".to_string()),
            &[0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Conferencing calls are bounded by the request timeout (10s default)
        .set_buckets_for_metric(
            Matcher::Prefix("rooms_conferencing_request".to_string()),
            &[0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set conferencing request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full("rooms_start_lock_wait_seconds".to_string()),
            &[0.001, 0.010, 0.050, 0.100, 0.500, 1.000, 5.000, 15.000],
        )
        .map_err(|e| format!("Failed to set lock wait buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("rooms_db_query".to_string()),
            &[0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `rooms_http_requests_total`, `rooms_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("rooms_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("rooms_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => {
            let parts: Vec<&str> = path.split('/').collect();
            // /callbacks/meetings/{id}/end
            if parts.len() == 5
                && parts.get(1) == Some(&"callbacks")
                && parts.get(2) == Some(&"meetings")
                && parts.get(4) == Some(&"end")
            {
                "/callbacks/meetings/{id}/end"
            } else {
                "/other"
            }
        }
    }
}

// ============================================================================
// Lifecycle Metrics
// ============================================================================

/// Record a start attempt.
///
/// Metric: `rooms_start_total`
/// Labels: `outcome`
pub fn record_start(outcome: &'static str) {
    counter!("rooms_start_total", "outcome" => outcome).increment(1);
}

/// Record a join attempt.
///
/// Metric: `rooms_join_total`
/// Labels: `outcome`
pub fn record_join(outcome: &'static str) {
    counter!("rooms_join_total", "outcome" => outcome).increment(1);
}

/// Record time spent waiting for a room's start lock.
///
/// Metric: `rooms_start_lock_wait_seconds`
pub fn record_start_lock_wait(acquired: bool, duration: Duration) {
    histogram!("rooms_start_lock_wait_seconds",
        "acquired" => if acquired { "true" } else { "false" }
    )
    .record(duration.as_secs_f64());
}

/// Record meetings ended by a server panic.
///
/// Metric: `rooms_panic_meetings_total`
/// Labels: `status`
pub fn record_panic_meetings(succeeded: u64, failed: u64) {
    counter!("rooms_panic_meetings_total", "status" => "success").increment(succeeded);
    counter!("rooms_panic_meetings_total", "status" => "error").increment(failed);
}

// ============================================================================
// Conferencing Server Metrics
// ============================================================================

/// Record a conferencing API call.
///
/// Metric: `rooms_conferencing_request_duration_seconds`,
/// `rooms_conferencing_requests_total`
/// Labels: `operation`, `status`
pub fn record_conferencing_request(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("rooms_conferencing_request_duration_seconds",
        "operation" => operation,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("rooms_conferencing_requests_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

/// Record a server status transition.
///
/// Metric: `rooms_server_status_changes_total`
/// Labels: `status` (the new status)
pub fn record_server_status_change(status: &'static str) {
    counter!("rooms_server_status_changes_total", "status" => status).increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `rooms_db_query_duration_seconds`, `rooms_db_queries_total`
/// Labels: `operation`, `status`
pub fn record_db_query(operation: &'static str, status: &'static str, duration: Duration) {
    histogram!("rooms_db_query_duration_seconds",
        "operation" => operation
    )
    .record(duration.as_secs_f64());

    counter!("rooms_db_queries_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

// ============================================================================
// Tests
// ============================================================================
