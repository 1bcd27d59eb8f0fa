//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "nw_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "nw_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "nw_http_requests_in_flight";

    // Usage gate
    pub const USAGE_ATTEMPTS_TOTAL: &str = "nw_usage_attempts_total";
    pub const SESSIONS_CREATED_TOTAL: &str = "nw_sessions_created_total";

    // Capabilities
    pub const CAPABILITIES_ISSUED_TOTAL: &str = "nw_capabilities_issued_total";
    pub const DOCUMENTS_NOT_READY_TOTAL: &str = "nw_documents_not_ready_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "nw_rate_limit_hits_total";
}

/// Paths reported verbatim; everything else is folded into one label.
const KNOWN_PATHS: &[&str] = &[
    "/api/use-feature",
    "/api/get-presigned-url",
    "/api/get-generated-markdown-url",
    "/health",
    "/healthz",
    "/ready",
    "/metrics",
];

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a usage gate decision (`allowed` / `quota_exceeded`).
pub fn record_usage_attempt(outcome: &'static str) {
    counter!(names::USAGE_ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a newly minted session.
pub fn record_session_created() {
    counter!(names::SESSIONS_CREATED_TOTAL).increment(1);
}

/// Record an issued capability (`upload` / `read`).
pub fn record_capability_issued(kind: &'static str) {
    counter!(names::CAPABILITIES_ISSUED_TOTAL, "kind" => kind).increment(1);
}

/// Record a document lookup that found nothing yet.
pub fn record_document_not_ready() {
    counter!(names::DOCUMENTS_NOT_READY_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint).to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Bound label cardinality to the routes this server exposes.
fn sanitize_path(path: &str) -> &str {
    KNOWN_PATHS
        .iter()
        .find(|known| **known == path)
        .copied()
        .unwrap_or("unmatched")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
