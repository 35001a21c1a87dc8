//! External interrupt signal.
//!
//! Each signal bumps a counter in a `watch` channel. A receiver tracks which
//! signals it has already acknowledged, so a signal consumed by the polling
//! loop does not also cancel the shutdown pass that follows it.

use std::sync::Arc;
use tokio::sync::watch;

/// Fires interrupts. Held by the signal listener.
#[derive(Debug, Clone)]
pub struct InterruptTrigger {
    tx: Arc<watch::Sender<u64>>,
}

/// Observes interrupts fired by an [`InterruptTrigger`].
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<u64>,
}

pub fn channel() -> (InterruptTrigger, Interrupt) {
    let (tx, rx) = watch::channel(0);
    (InterruptTrigger { tx: Arc::new(tx) }, Interrupt { rx })
}

impl InterruptTrigger {
    pub fn fire(&self) {
        self.tx.send_modify(|count| *count += 1);
    }
}

impl Interrupt {
    /// Whether a signal arrived that has not been acknowledged yet.
    pub fn is_pending(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Mark every signal received so far as handled.
    pub fn acknowledge(&mut self) {
        self.rx.borrow_and_update();
    }

    /// Wait for the next unacknowledged signal and acknowledge it.
    ///
    /// Resolves immediately if one is already pending. Never resolves once
    /// the trigger is gone.
    pub async fn recv(&mut self) {
        if self.rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
