//! Audit logging for mutating requests.
//!
//! The operator identity comes from the `x-operator-id` header supplied by the
//! session collaborator in front of this service. It is recorded, never checked.

use axum::{extract::Request, http::Method, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

use super::request_id::REQUEST_ID_HEADER;

/// Header carrying the caller identity for audit purposes
pub const OPERATOR_HEADER: &str = "x-operator-id";

pub const ANONYMOUS_OPERATOR: &str = "anonymous";

/// Reads the operator identity from request headers, falling back to `anonymous`.
pub fn operator_from_headers(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(OPERATOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_OPERATOR)
        .to_string()
}

fn is_mutation(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Logs one audit line per mutating request, after the response is produced.
pub async fn audit_middleware(req: Request, next: Next) -> Response {
    if !is_mutation(req.method()) {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let operator = operator_from_headers(req.headers());
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let response = next.run(req).await;

    let status_code = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        warn!(
            target: "audit",
            operator = %operator,
            request_id = ?request_id,
            method = %method,
            path = %path,
            status_code,
            duration_ms,
            "mutation failed"
        );
    } else {
        info!(
            target: "audit",
            operator = %operator,
            request_id = ?request_id,
            method = %method,
            path = %path,
            status_code,
            duration_ms,
            "mutation"
        );
    }

    response
}
