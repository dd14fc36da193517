//! Director: outbound request targeting.
//!
//! Rewrites an admitted request's target to the fixed upstream. The scheme
//! and authority always come from the upstream URL; path, query, method,
//! remaining headers (Authorization included), and body are forwarded
//! unchanged. The inbound Host header never influences where the request
//! goes.

use axum::http::{header, request::Parts, HeaderMap, Uri};
use std::net::SocketAddr;
use url::Url;

/// Headers that describe the inbound hop, not the request, and must not be
/// forwarded. The outbound client re-frames the body, so the two framing
/// headers are stripped with them.
const HOP_BY_HOP: [header::HeaderName; 9] = [
    header::CONNECTION,
    header::HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

/// Build the outbound URL: upstream scheme and authority, inbound path and
/// query.
pub fn rewrite_url(upstream: &Url, uri: &Uri) -> Url {
    let mut out = upstream.clone();
    out.set_path(uri.path());
    out.set_query(uri.query());
    out
}

/// Build the outbound header set: everything forwarded verbatim except
/// Host, hop-by-hop headers, and body framing. The client derives Host
/// from the rewritten URL, which keeps the outbound authority equal to the
/// upstream authority regardless of what the caller sent.
pub fn outbound_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    headers.remove(header::HOST);
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers
}

/// Log the rewrite. The baseline tier records method, rewritten path, and
/// full rewritten URL. The verbose tier additionally dumps every header
/// before and after rewriting plus the identity headers; it writes
/// Authorization values to the log and is gated behind configuration.
pub fn log_forward(
    parts: &Parts,
    remote: SocketAddr,
    url: &Url,
    outbound: &HeaderMap,
    verbose: bool,
) {
    tracing::debug!(
        method = %parts.method,
        path = %url.path(),
        url = %url,
        "Proxying request"
    );

    if !verbose {
        return;
    }

    tracing::debug!(
        remote = %remote,
        host = ?parts.headers.get(header::HOST),
        "Inbound request"
    );
    for (name, value) in parts.headers.iter() {
        tracing::debug!(
            header = %name,
            value = %String::from_utf8_lossy(value.as_bytes()),
            "Inbound header"
        );
    }
    tracing::debug!(
        user_agent = ?parts.headers.get(header::USER_AGENT),
        accept = ?parts.headers.get(header::ACCEPT),
        authorization = ?parts.headers.get(header::AUTHORIZATION),
        "Outgoing identity headers"
    );
    for (name, value) in outbound.iter() {
        tracing::debug!(
            header = %name,
            value = %String::from_utf8_lossy(value.as_bytes()),
            "Outgoing header"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn upstream() -> Url {
        Url::parse("https://api.idle-mmo.com").unwrap()
    }

    #[test]
    fn rewrite_preserves_path_and_query() {
        let uri: Uri = "/v1/items?page=2&sort=name".parse().unwrap();
        let url = rewrite_url(&upstream(), &uri);
        assert_eq!(
            url.as_str(),
            "https://api.idle-mmo.com/v1/items?page=2&sort=name"
        );
    }

    #[test]
    fn rewrite_replaces_authority_and_scheme() {
        let uri: Uri = "/character/profile".parse().unwrap();
        let url = rewrite_url(&upstream(), &uri);
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("api.idle-mmo.com"));
        assert_eq!(url.query(), None);
    }

    #[test]
    fn root_path_maps_to_root() {
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(
            rewrite_url(&upstream(), &uri).as_str(),
            "https://api.idle-mmo.com/"
        );
    }

    #[test]
    fn outbound_headers_strip_host_and_hop_by_hop() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("proxy.local"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert(
            header::TRANSFER_ENCODING,
            HeaderValue::from_static("chunked"),
        );
        inbound.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer idlemmo123"),
        );
        inbound.insert("x-custom", HeaderValue::from_static("kept"));

        let outbound = outbound_headers(&inbound);
        assert!(outbound.get(header::HOST).is_none());
        assert!(outbound.get(header::CONNECTION).is_none());
        assert!(outbound.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(
            outbound.get(header::AUTHORIZATION).unwrap(),
            "Bearer idlemmo123"
        );
        assert_eq!(outbound.get("x-custom").unwrap(), "kept");
    }
}
