//! Cooperative cancellation for writers waiting on the write section.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag a caller flips to withdraw a pending mutation.
///
/// Only a writer that has not yet entered the write section observes it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
