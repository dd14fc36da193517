//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging with key-value fields, never format strings
//! - Request ID flows through every per-request log line
//! - Metrics are cheap (atomic increments) and off by default
//! - Secrets appear in logs only behind the explicit verbose tier

pub mod logging;
pub mod metrics;
