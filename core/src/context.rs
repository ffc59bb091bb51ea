//! Cancellation and deadline token passed to every store operation.
//!
//! A [`Context`] is cheap to clone; clones share the same cancel flag.
//! Derived contexts ([`Context::child`], [`Context::with_timeout`]) fire
//! when either they or any ancestor fire, and never earlier than the
//! tightest deadline along the chain.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use userstore_core::{Context, ContextError};
//!
//! let root = Context::background();
//! let op = root.with_timeout(Duration::from_secs(30));
//! assert!(op.err().is_none());
//!
//! root.cancel();
//! assert_eq!(op.err(), Some(ContextError::Cancelled));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Reason a [`Context`] is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("operation cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation/deadline token.
#[derive(Debug, Clone)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
    parent: Option<Arc<Context>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A root context with no deadline that only fires if cancelled.
    pub fn background() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
            parent: None,
        }
    }

    /// Derives a context that can be cancelled independently of `self`.
    pub fn child(&self) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: self.deadline,
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Derives a context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a context that expires at `deadline`, or at the inherited
    /// deadline if that is earlier.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut ctx = self.child();
        ctx.deadline = Some(match self.deadline {
            Some(inherited) => inherited.min(deadline),
            None => deadline,
        });
        ctx
    }

    /// Fires this context and every context derived from it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` if there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns why the context is done, or `None` while it is still live.
    ///
    /// Cancellation takes precedence over an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Returns `Err` if the context is done.
    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_never_fires() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_children_not_parents() {
        let root = Context::background();
        let child = root.child();
        let grandchild = child.child();

        child.cancel();
        assert!(root.err().is_none());
        assert_eq!(child.err(), Some(ContextError::Cancelled));
        assert_eq!(grandchild.err(), Some(ContextError::Cancelled));
    }

    #[test]
    fn test_clones_share_cancellation() {
        let ctx = Context::background();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_done());
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = Context::background().with_timeout(Duration::ZERO);
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
        assert!(ctx.check().is_err());
    }

    #[test]
    fn test_child_keeps_tighter_deadline() {
        let outer = Context::background().with_timeout(Duration::from_millis(10));
        let inner = outer.with_timeout(Duration::from_secs(3600));
        assert_eq!(inner.deadline(), outer.deadline());
    }

    #[test]
    fn test_cancel_wins_over_deadline() {
        let ctx = Context::background().with_timeout(Duration::ZERO);
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
    }
}
