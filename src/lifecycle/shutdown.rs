//! Shutdown coordination for the server and operator.

use std::future::Future;

use tokio::sync::{broadcast, oneshot};

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// A `Send + Sync` future resolving when shutdown is triggered.
    ///
    /// Subscribes immediately; a trigger sent before this call is not seen.
    /// Must be called from within a Tokio runtime.
    pub fn notified(&self) -> impl Future<Output = ()> + Send + Sync + 'static {
        let mut rx = self.tx.subscribe();
        let (done_tx, done_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = rx.recv().await;
            let _ = done_tx.send(());
        });
        async move {
            let _ = done_rx.await;
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
