//! IdleMMO API Proxy
//!
//! An authenticating CORS proxy in front of the IdleMMO API, built with
//! Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                 IDLEMMO PROXY                     │
//!                      │                                                   │
//!   Client Request     │  ┌──────────┐   ┌──────────┐   ┌─────────────┐  │
//!   ───────────────────┼─▶│  http    │──▶│gatekeeper│──▶│  director   │  │
//!                      │  │  server  │   │  (auth)  │   │ (rewrite)   │  │
//!                      │  └──────────┘   └────┬─────┘   └──────┬──────┘  │
//!                      │                      │ 401/OPTIONS    │          │
//!                      │                      ▼                ▼          │
//!   Client Response    │  ┌──────────┐   ┌──────────┐   ┌─────────────┐  │      Upstream
//!   ◀──────────────────┼──│ response │◀──│ response │◀──│  outbound   │◀─┼───── API
//!                      │  │ to caller│   │  shaper  │   │ HTTPS call  │  │   (idle-mmo.com)
//!                      │  └──────────┘   └──────────┘   └─────────────┘  │
//!                      │                                                   │
//!                      │  ┌─────────────────────────────────────────────┐ │
//!                      │  │           Cross-Cutting Concerns             │ │
//!                      │  │  ┌────────┐ ┌─────────────┐ ┌────────────┐  │ │
//!                      │  │  │ config │ │observability│ │ lifecycle  │  │ │
//!                      │  │  └────────┘ └─────────────┘ └────────────┘  │ │
//!                      │  └─────────────────────────────────────────────┘ │
//!                      └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use idlemmo_proxy::http::HttpServer;
use idlemmo_proxy::lifecycle::{signals, Shutdown};
use idlemmo_proxy::{config, observability};

/// IdleMMO API Proxy
///
/// Authenticates inbound requests with a bearer-token format check and
/// forwards them to the IdleMMO API with CORS headers injected.
#[derive(Parser, Debug)]
#[command(name = "idlemmo-proxy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides PORT env var and config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    /// Log full request headers, including Authorization values.
    /// Dumps secrets to the log sink; development use only.
    #[arg(long)]
    log_headers: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration first so the log level can come from it
    let mut config = match config::loader::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            observability::logging::init("info");
            tracing::error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    // CLI arguments override file and environment
    if let Some(port) = args.port {
        config.listener.set_port(port);
    }
    if let Some(log_level) = args.log_level {
        config.observability.log_level = log_level;
    }
    if args.log_headers {
        config.observability.log_headers = true;
    }

    observability::logging::init(&config.observability.log_level);

    tracing::info!("idlemmo-proxy v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    // Metrics exporter
    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // Bind TCP listener
    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(
                bind_address = %config.listener.bind_address,
                error = %e,
                "Failed to bind listener"
            );
            return Err(e.into());
        }
    };
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        upstream = %config.upstream.url,
        "Listening for connections"
    );

    // Wire Ctrl+C to graceful shutdown
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::install(shutdown);

    // Create and run the HTTP server; upstream URL parse failure is fatal here
    let server = match HttpServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize server");
            return Err(e.into());
        }
    };
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
