use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Handle for cancelling an in-flight relay when the caller disconnects.
#[derive(Clone)]
pub struct RelayCancelHandle {
    sender: watch::Sender<bool>,
    receiver: watch::Receiver<bool>,
    /// Flag to track if the relay finished normally (not a disconnect)
    completed: Arc<AtomicBool>,
}

impl RelayCancelHandle {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender,
            receiver,
            completed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the relay as completed normally. Called when the upstream body
    /// reaches end-of-stream.
    pub fn mark_completed(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }

    /// Check if the relay completed normally
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Signal cancellation (only if not already completed)
    pub fn cancel(&self) {
        if !self.is_completed() {
            let _ = self.sender.send(true);
        }
    }

    /// Check if cancelled
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Get a receiver for use in select!
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.receiver.clone()
    }
}

impl Default for RelayCancelHandle {
    fn default() -> Self {
        Self::new()
    }
}
