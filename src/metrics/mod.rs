//! Prometheus counters for the workflow and the registries.
//!
//! Everything registers with the default registry; [`gather_metrics`] renders
//! it in the text exposition format for the `/metrics` endpoint.

use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};
use std::time::Instant;
use tracing::trace;

use crate::errors::ServiceError;

lazy_static! {
    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "carservice_http_requests_total",
        "Total number of HTTP requests by status class",
        &["class"]
    )
    .expect("metric can be registered");

    pub static ref HTTP_REQUEST_DURATION: Histogram = register_histogram!(
        "carservice_http_request_duration_seconds",
        "HTTP request latencies in seconds"
    )
    .expect("metric can be registered");

    // Workflow metrics
    pub static ref WORKFLOW_OPERATIONS: IntCounterVec = register_int_counter_vec!(
        "carservice_workflow_operations_total",
        "Committed service workflow operations",
        &["operation"]
    )
    .expect("metric can be registered");

    pub static ref WORKFLOW_FAILURES: IntCounterVec = register_int_counter_vec!(
        "carservice_workflow_failures_total",
        "Rejected or failed service workflow operations",
        &["operation", "error_type"]
    )
    .expect("metric can be registered");

    // Registry metrics
    pub static ref REGISTRY_OPERATIONS: IntCounterVec = register_int_counter_vec!(
        "carservice_registry_operations_total",
        "Committed user and vehicle registry operations",
        &["entity", "operation"]
    )
    .expect("metric can be registered");

    pub static ref REGISTRY_FAILURES: IntCounterVec = register_int_counter_vec!(
        "carservice_registry_failures_total",
        "Rejected or failed user and vehicle registry operations",
        &["entity", "operation", "error_type"]
    )
    .expect("metric can be registered");
}

/// Counts a committed workflow operation.
pub fn record_workflow(operation: &str) {
    WORKFLOW_OPERATIONS.with_label_values(&[operation]).inc();
}

/// Counts a workflow operation that ended in `err`.
pub fn record_workflow_failure(operation: &str, err: &ServiceError) {
    WORKFLOW_FAILURES
        .with_label_values(&[operation, err.code()])
        .inc();
}

/// Counts a committed user or vehicle operation.
pub fn record_registry(entity: &str, operation: &str) {
    REGISTRY_OPERATIONS
        .with_label_values(&[entity, operation])
        .inc();
}

pub fn record_registry_failure(entity: &str, operation: &str, err: &ServiceError) {
    REGISTRY_FAILURES
        .with_label_values(&[entity, operation, err.code()])
        .inc();
}

/// Record HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, started: Instant) {
    let class = match status {
        100..=399 => "ok",
        400..=499 => "client_error",
        _ => "server_error",
    };
    HTTP_REQUESTS_TOTAL.with_label_values(&[class]).inc();

    let elapsed = started.elapsed().as_secs_f64();
    trace!(
        http.method = method,
        http.path = path,
        http.status = status,
        latency_secs = elapsed,
        "recording HTTP request metrics"
    );
    HTTP_REQUEST_DURATION.observe(elapsed);
}

/// Middleware feeding [`record_http_request`] for every response.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;
    record_http_request(&method, &path, response.status().as_u16(), started);
    response
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> Result<String, ServiceError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics encoding failed: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ServiceError::InternalError(format!("metrics are not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_counters_show_up_in_output() {
        record_workflow("confirm_date");
        record_workflow_failure("confirm_date", &ServiceError::not_found("Service", 1));
        let text = gather_metrics().unwrap();
        assert!(text.contains("carservice_workflow_operations_total"));
        assert!(text.contains("error_type=\"not_found\""));
    }

    #[test]
    fn http_status_is_bucketed_by_class() {
        let before = HTTP_REQUESTS_TOTAL.with_label_values(&["client_error"]).get();
        record_http_request("GET", "/api/v1/services/9", 404, Instant::now());
        assert!(HTTP_REQUESTS_TOTAL.with_label_values(&["client_error"]).get() > before);
    }
}
