//! Cooperative cancellation shared between the caller and batch workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Clonable flag; once cancelled, trials that have not launched yet are
/// skipped. Trials already running are left to finish.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
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
