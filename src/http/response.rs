//! Response Shaper: CORS injection and response logging.
//!
//! # Responsibilities
//! - Set the three CORS headers on every response the proxy sends,
//!   whatever its origin (upstream, preflight, rejection, error path)
//! - Log status and content headers; log rate-limit hints when present
//! - Never alter status codes or bodies
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the upstream body
//! - No original upstream header is removed

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

pub const ALLOW_ORIGIN_ANY: &str = "*";
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization, User-Agent";

/// Rate-limit hints the upstream is known to emit.
const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Set the three CORS headers. Existing values for other headers are left
/// alone; existing CORS values are overwritten with ours.
pub fn inject_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN_ANY),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}

/// Log the upstream response: status, content headers, and rate-limit
/// hints. Absent rate-limit headers are simply not logged.
pub fn log_upstream(status: StatusCode, headers: &HeaderMap) {
    tracing::debug!(
        status = %status,
        content_type = ?headers.get(header::CONTENT_TYPE),
        content_length = ?headers.get(header::CONTENT_LENGTH),
        "Upstream response"
    );

    let limit = headers.get(RATE_LIMIT_LIMIT).and_then(|v| v.to_str().ok());
    let remaining = headers
        .get(RATE_LIMIT_REMAINING)
        .and_then(|v| v.to_str().ok());
    if limit.is_some() || remaining.is_some() {
        tracing::info!(
            rate_limit = ?limit,
            rate_remaining = ?remaining,
            "Upstream rate-limit hints"
        );
    }
}

/// Synthesized CORS preflight response: 200, CORS headers, empty body.
pub fn preflight() -> Response {
    let mut response = StatusCode::OK.into_response();
    inject_cors(response.headers_mut());
    response
}

/// Synthesized error-path response when no upstream response was
/// obtainable at all.
pub fn bad_gateway() -> Response {
    let mut response = (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response();
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN_ANY),
    );
    response
}

/// Relay an upstream response: same status, same headers plus CORS, body
/// streamed through.
pub fn relay(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    let headers = upstream.headers().clone();

    log_upstream(status, &headers);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    inject_cors(response.headers_mut());
    response
}
