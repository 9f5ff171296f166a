//! Execution context
//!
//! One context per statement execution. Iterators capture a clone and check it
//! between units of work so long-running operators abort promptly when the
//! execution is cancelled.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Execution-scoped context threaded into every row iterator.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    cancelled: Arc<AtomicBool>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; in-flight iterators observe it at their next
    /// unit-of-work boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns `Error::Cancelled` once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_observed_by_clones() {
        let ctx = ExecutionContext::new();
        let clone = ctx.clone();
        assert!(clone.check().is_ok());
        ctx.cancel();
        assert_eq!(clone.check(), Err(Error::Cancelled));
    }
}
