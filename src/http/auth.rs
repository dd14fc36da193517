//! Gatekeeper: bearer-token admission control.
//!
//! Inspects the Authorization header before any proxying occurs and admits
//! or rejects the request. The check is a format check only: the credential
//! must use the `Bearer` scheme and the token must start with the known
//! prefix. Nothing is validated against an issuer or expiry, so this is a
//! gate against casual misuse, not real authentication.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::response::ALLOW_ORIGIN_ANY;

/// The exact scheme prefix, case-sensitive.
const BEARER_PREFIX: &str = "Bearer ";

/// Required leading characters of the token portion.
const TOKEN_PREFIX: &str = "idlemmo";

/// At most this many token characters appear in admission logs.
const LOGGED_TOKEN_CHARS: usize = 10;

/// Outcome of evaluating the Authorization header. Computed once per
/// request, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthDecision {
    /// Correct scheme and token format; proceed to the director.
    Admitted,
    /// Header absent or empty.
    MissingHeader,
    /// Header present but not `Bearer `-prefixed (or not readable ASCII).
    MalformedScheme,
    /// Bearer credential present but the token fails the format check.
    MalformedToken,
}

impl AuthDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AuthDecision::Admitted)
    }

    /// Short reason string for rejection logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthDecision::Admitted => "admitted",
            AuthDecision::MissingHeader => "missing Authorization header",
            AuthDecision::MalformedScheme => "invalid Authorization format",
            AuthDecision::MalformedToken => "invalid token format",
        }
    }

    /// Response body sent to the caller on rejection.
    fn body(&self) -> Option<&'static str> {
        match self {
            AuthDecision::Admitted => None,
            AuthDecision::MissingHeader => Some("Unauthorized: Missing Authorization header"),
            AuthDecision::MalformedScheme => Some("Unauthorized: Invalid Authorization format"),
            AuthDecision::MalformedToken => Some("Unauthorized: Invalid token format"),
        }
    }
}

impl IntoResponse for AuthDecision {
    /// Synthesize the 401 for a rejection. Every rejection carries the CORS
    /// allow-origin header so browsers surface the status to callers.
    fn into_response(self) -> Response {
        let body = self.body().unwrap_or_default();
        (
            StatusCode::UNAUTHORIZED,
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN_ANY)],
            body,
        )
            .into_response()
    }
}

/// Evaluate the Authorization header into an admission decision.
///
/// Parsing and policy are separate steps: the header splits into a
/// {scheme, credential} pair, then [`token_format_ok`] judges the
/// credential.
pub fn evaluate(headers: &HeaderMap) -> AuthDecision {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return AuthDecision::MissingHeader;
    };
    let Ok(value) = value.to_str() else {
        return AuthDecision::MalformedScheme;
    };
    if value.is_empty() {
        return AuthDecision::MissingHeader;
    }
    let Some(token) = value.strip_prefix(BEARER_PREFIX) else {
        return AuthDecision::MalformedScheme;
    };
    if token_format_ok(token) {
        AuthDecision::Admitted
    } else {
        AuthDecision::MalformedToken
    }
}

/// Policy predicate over the bearer credential: at least as long as the
/// required prefix, and starting with it exactly. Anything after the prefix
/// is accepted, including nothing at all.
pub fn token_format_ok(token: &str) -> bool {
    let prefix = TOKEN_PREFIX.as_bytes();
    token.len() >= prefix.len() && &token.as_bytes()[..prefix.len()] == prefix
}

/// Truncated token prefix for admission logs; never the full secret.
pub fn loggable_token(headers: &HeaderMap) -> String {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .unwrap_or_default();
    let mut end = token.len().min(LOGGED_TOKEN_CHARS);
    while !token.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &token[..end])
}
