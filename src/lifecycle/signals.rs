//! OS signal handling.
//!
//! Translates Ctrl+C into the internal shutdown broadcast. Repeated
//! signals are absorbed; the first one wins.

use crate::lifecycle::Shutdown;

/// Spawn the signal listener. Takes ownership of the coordinator; every
/// interested task should have subscribed before this is called.
pub fn install(shutdown: Shutdown) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                shutdown.trigger();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            }
        }
    });
}
