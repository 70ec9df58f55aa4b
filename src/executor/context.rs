//! Cancellation for in-flight profile calls.

use tokio::sync::watch;

/// Cancellation signal handed to every profile call.
///
/// Clones observe the same signal. A context created with
/// [`TrxContext::background`] is never cancelled.
#[derive(Debug, Clone)]
pub struct TrxContext {
    cancelled: watch::Receiver<bool>,
}

/// Owner side of a [`TrxContext`].
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl TrxContext {
    pub fn new() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { cancelled: rx }, CancelHandle { tx })
    }

    pub fn background() -> Self {
        let (_, rx) = watch::channel(false);
        Self { cancelled: rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }

    /// Resolves once the context is cancelled. Pending forever otherwise.
    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without cancelling.
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for TrxContext {
    fn default() -> Self {
        Self::background()
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}
