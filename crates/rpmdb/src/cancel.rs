//! Cooperative cancellation for database traversal.
//!
//! The blob iterators poll the token between reads; a cancelled token makes
//! them stop with [`Error::Cancelled`](crate::Error::Cancelled) before
//! touching the next page, slot or row. The flag is shared, so one clone can
//! be handed to another thread or a signal handler without coupling the
//! readers to any runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag threaded through every blob iterator.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Readers observe it before their next read.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
