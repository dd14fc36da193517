//! Shutdown coordination for the proxy.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// The server holds a receiver and stops accepting connections when the
/// signal fires; in-flight requests drain before the process exits. Tests
/// hold the coordinator itself and trigger it directly.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal. Must happen before [`trigger`]
    /// for the subscriber to observe it.
    ///
    /// [`trigger`]: Shutdown::trigger
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the shutdown signal. Idempotent; later calls are no-ops as
    /// far as subscribers are concerned.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
