//! # Request Metrics
//!
//! Counts requests and error responses through the `metrics` facade:
//! `lm_http_requests_total` and `lm_http_errors_total`, labelled by method,
//! matched route, and status. The facade counters reach Prometheus through
//! the recorder installed by the binary and are rendered at `/metrics`.

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

pub const HTTP_REQUESTS_TOTAL: &str = "lm_http_requests_total";
pub const HTTP_ERRORS_TOTAL: &str = "lm_http_errors_total";

/// Middleware that records one request and, for 4xx/5xx, one error.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;

    let status = response.status();
    let is_error = status.is_client_error() || status.is_server_error();
    let status = status.as_u16().to_string();
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);
    if is_error {
        metrics::counter!(
            HTTP_ERRORS_TOTAL,
            "method" => method,
            "path" => path,
            "status" => status
        )
        .increment(1);
    }

    response
}
