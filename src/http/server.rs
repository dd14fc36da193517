//! HTTP server setup and the proxy pipeline handler.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Compose the pipeline: gatekeeper → director → outbound call → shaper
//! - Map outbound transport failures, timeouts included, to the 502 error
//!   path
//!
//! # Concurrency
//! One task per connection, provided by Axum/Tokio. The handler holds no
//! shared mutable state; the only process-wide values are the parsed
//! upstream URL and the outbound client, both read-only after startup.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::config::ProxyConfig;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::http::{auth, director, response};
use crate::observability::metrics;

/// Fatal startup error; the server never starts with a broken upstream.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to parse upstream url: {0}")]
    Upstream(#[from] url::ParseError),

    #[error("failed to build outbound client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    /// Parsed upstream base URL; read-only after startup.
    pub upstream: Url,
    /// Outbound HTTP client with pooling and TLS.
    pub client: reqwest::Client,
    /// Ceiling on one outbound attempt; an elapsed timeout takes the same
    /// path as any other transport fault.
    pub request_timeout: Duration,
    /// Verbose header-dump tier for the director.
    pub log_headers: bool,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Parses the upstream URL once; failure here is the only fatal
    /// configuration path after validation.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let upstream = config.upstream.parsed()?;

        // Redirects pass through untouched; the proxy relays exactly what
        // the upstream answered
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.upstream.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;

        let state = AppState {
            upstream,
            client,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            log_headers: config.observability.log_headers,
        };

        let router = Self::build_router(state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The request timeout is not a layer: a layer-synthesized timeout
    /// response would bypass the shaper and reach the caller without CORS
    /// headers. The handler applies it around the outbound call instead.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// The proxy pipeline: gatekeeper → director → outbound call → shaper.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let method_str = method.to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // CORS preflight short-circuits everything, authentication included
    if method == Method::OPTIONS {
        tracing::debug!(request_id = %request_id, remote = %remote, "CORS preflight");
        metrics::record_request(&method_str, 200, "preflight", start_time);
        return response::preflight();
    }

    // Gatekeeper
    let decision = auth::evaluate(request.headers());
    if !decision.is_admitted() {
        tracing::warn!(
            request_id = %request_id,
            remote = %remote,
            reason = decision.reason(),
            "Request rejected"
        );
        metrics::record_request(&method_str, 401, "rejected", start_time);
        return decision.into_response();
    }
    tracing::debug!(
        request_id = %request_id,
        remote = %remote,
        token = %auth::loggable_token(request.headers()),
        "Request authenticated"
    );

    // Director
    let (parts, body) = request.into_parts();
    let url = director::rewrite_url(&state.upstream, &parts.uri);
    let headers = director::outbound_headers(&parts.headers);
    director::log_forward(&parts, remote, &url, &headers, state.log_headers);

    // A request without Content-Length or Transfer-Encoding has no body;
    // forwarding an empty known-length body avoids spurious chunking
    let has_body = parts.headers.contains_key(header::CONTENT_LENGTH)
        || parts.headers.contains_key(header::TRANSFER_ENCODING);
    let outbound_body = if has_body {
        reqwest::Body::wrap_stream(body.into_data_stream())
    } else {
        reqwest::Body::from(Vec::new())
    };

    // Single outbound attempt; the upstream attempt lives and dies with
    // this inbound request
    let outbound = tokio::time::timeout(
        state.request_timeout,
        state
            .client
            .request(parts.method.clone(), url.clone())
            .headers(headers)
            .body(outbound_body)
            .send(),
    )
    .await;

    match outbound {
        Ok(Ok(upstream_response)) => {
            let status = upstream_response.status().as_u16();
            metrics::record_request(&method_str, status, "proxied", start_time);
            response::relay(upstream_response)
        }
        Ok(Err(e)) => {
            // Error path: no upstream response was obtainable at all
            tracing::error!(
                request_id = %request_id,
                error = %e,
                method = %parts.method,
                url = %url,
                host = ?parts.headers.get(header::HOST),
                remote = %remote,
                "Upstream request failed"
            );
            metrics::record_request(&method_str, 502, "upstream_error", start_time);
            response::bad_gateway()
        }
        Err(_) => {
            tracing::error!(
                request_id = %request_id,
                timeout_secs = state.request_timeout.as_secs(),
                method = %parts.method,
                url = %url,
                remote = %remote,
                "Upstream request timed out"
            );
            metrics::record_request(&method_str, 502, "upstream_error", start_time);
            response::bad_gateway()
        }
    }
}
