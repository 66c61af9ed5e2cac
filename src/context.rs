//! Command Context Module
//!
//! Carries the caller's deadline and cancellation state into each command.
//! Commands check the context once at entry and never poll it afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{CacheError, Result};

// == Context ==
/// Deadline/cancellation token threaded through every cache command.
///
/// A default context never expires and cannot be canceled.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Absolute deadline on the monotonic clock
    deadline: Option<Instant>,
    /// Shared cancel flag, set through the paired [`Canceller`]
    canceled: Option<Arc<AtomicBool>>,
}

impl Context {
    // == Constructors ==
    /// A context that never expires and cannot be canceled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            canceled: None,
        }
    }

    /// A cancelable context plus the handle that cancels it.
    pub fn cancellable() -> (Self, Canceller) {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = Self {
            deadline: None,
            canceled: Some(flag.clone()),
        };
        (ctx, Canceller { flag })
    }

    // == Accessors ==
    /// The absolute deadline, when one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    // == Check ==
    /// Errors when the context has been canceled or its deadline has
    /// passed. Cancellation takes precedence over the deadline.
    pub fn check(&self) -> Result<()> {
        if let Some(flag) = &self.canceled {
            if flag.load(Ordering::Relaxed) {
                return Err(CacheError::Canceled);
            }
        }
        if let Some(deadline) = self.deadline {
            if deadline <= Instant::now() {
                return Err(CacheError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

// == Canceller ==
/// Cancels the paired context. Clones share the same flag, so any of them
/// can cancel and the effect is visible to every context clone.
#[derive(Debug, Clone)]
pub struct Canceller {
    flag: Arc<AtomicBool>,
}

impl Canceller {
    /// Marks the paired context as canceled.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}
