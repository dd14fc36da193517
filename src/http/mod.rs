//! HTTP pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, per-request task)
//!     → request.rs (add X-Request-ID)
//!     → auth.rs (gatekeeper: OPTIONS short-circuit, bearer format check)
//!     → director.rs (rewrite target to the fixed upstream)
//!     → outbound HTTPS call
//!     → response.rs (shaper: inject CORS headers, log rate-limit hints)
//!     → Send to client
//! ```
//!
//! The three pipeline stages are plain functions composed explicitly in the
//! proxy handler, not hooks on a shared proxy object; each is unit-testable
//! without HTTP plumbing.

pub mod auth;
pub mod director;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::HttpServer;
