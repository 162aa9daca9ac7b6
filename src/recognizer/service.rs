//! LockService - drives a PatternLock from a channel of pointer events
//!
//! For hosts without a frame loop. The task sleeps until the next pending
//! reset, applies pointer events as they arrive, and stops on shutdown or
//! when the event sender is dropped. The widget is handed back on exit.

use std::time::Instant;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use super::{PatternLock, PointerEvent, Release};

pub struct LockService {
    lock: PatternLock,
    outcomes: Option<mpsc::UnboundedSender<Release>>,
}

impl LockService {
    pub fn new(lock: PatternLock) -> Self {
        Self { lock, outcomes: None }
    }

    /// Forward every release outcome (including mismatches and short drags).
    pub fn with_outcomes(mut self, tx: mpsc::UnboundedSender<Release>) -> Self {
        self.outcomes = Some(tx);
        self
    }

    pub fn spawn(
        mut self,
        mut events: mpsc::UnboundedReceiver<PointerEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<PatternLock> {
        tokio::spawn(async move {
            loop {
                let deadline = self.lock.next_deadline();
                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!("lock service shutting down");
                        break;
                    }
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        if let Some(release) = self.lock.handle(event, Instant::now()) {
                            if let Some(tx) = &self.outcomes {
                                let _ = tx.send(release);
                            }
                        }
                    }
                    _ = wait_until(deadline) => {
                        self.lock.poll(Instant::now());
                    }
                }
            }
            self.lock
        })
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending::<()>().await,
    }
}
