//! Runtime - shutdown signalling for background lock services

use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Shutdown signal broadcaster
#[derive(Clone)]
pub struct Shutdown {
    sender: broadcast::Sender<()>,
    triggered: Arc<RwLock<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self { Self::new() }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender, triggered: Arc::new(RwLock::new(false)) }
    }

    /// Subscribe to shutdown signal
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Trigger shutdown. Later calls are no-ops.
    pub async fn trigger(&self) {
        let mut triggered = self.triggered.write().await;
        if !*triggered {
            *triggered = true;
            let _ = self.sender.send(());
            tracing::debug!("shutdown triggered");
        }
    }
}

/// Trigger `shutdown` on Ctrl+C. Errors installing the handler are logged
/// and the signal is simply never delivered.
pub fn shutdown_on_ctrl_c(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl+C");
                shutdown.trigger().await;
            }
            Err(e) => tracing::warn!(error = %e, "ctrl-c handler unavailable"),
        }
    })
}
