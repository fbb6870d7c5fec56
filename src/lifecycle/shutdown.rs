//! Shutdown coordination for the bridge.
//!
//! The flag is latched: a task that starts waiting after the trigger still
//! sees it, so a server spawned late cannot miss the stop.

use std::future::Future;
use tokio::sync::watch;

/// Latched shutdown flag shared by the server and its launcher.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Future that resolves once shutdown is triggered, or when the
    /// coordinator is dropped.
    pub fn signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // an error means the coordinator is gone, which also ends serving
            let _ = rx.wait_for(|stopped| *stopped).await;
        }
    }

    /// Fire the shutdown. Returns false if it had already fired.
    pub fn trigger(&self) -> bool {
        let first = !self.tx.send_replace(true);
        if first {
            tracing::info!("Shutdown triggered");
        }
        first
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
