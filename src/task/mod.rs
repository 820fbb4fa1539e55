//! Cancellation capabilities.
//!
//! An [`AsyncTask`] is the only thing a caller gets back for an in-flight
//! operation: a handle that can request cancellation. It carries no result and
//! no state beyond "cancel requested". Every producer may return one, every
//! terminal consumer returns one, and every combinator forwards cancellation
//! through one.
//!
//! # Handles
//!
//! - [`FnTask`]: runs a closure the first time it is cancelled
//! - [`CancelToken`]: a flag that producers poll
//! - [`SerialTask`]: forwards to a target that can be swapped while running
//! - [`AsyncTaskContainer`]: bulk cancellation of many handles
//!
//! Cancellation is cooperative and immediate: `cancel()` returns without
//! waiting for the underlying work to stop.

mod container;
mod serial;

pub use container::AsyncTaskContainer;
pub use serial::SerialTask;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::CancelReason;

/// A cancellation-only handle to an in-flight operation.
pub trait AsyncTask: Send + Sync {
    /// Requests cancellation.
    ///
    /// Must be idempotent; calls after the first are no-ops.
    fn cancel(&self);

    /// Requests cancellation with a structured reason.
    ///
    /// Handles that forward cancellation (chain nodes, containers) pass the
    /// reason along; leaf handles may ignore it.
    fn cancel_with(&self, reason: &CancelReason) {
        let _ = reason;
        self.cancel();
    }
}

/// A shared, type-erased cancellation handle.
pub type TaskHandle = Arc<dyn AsyncTask>;

/// Cancellation handle backed by a closure.
///
/// The closure runs at most once, on the first `cancel`.
pub struct FnTask {
    on_cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FnTask {
    /// Creates a handle that runs `on_cancel` when cancelled.
    #[must_use]
    pub fn new<F>(on_cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            on_cancel: Mutex::new(Some(Box::new(on_cancel))),
        }
    }

    /// Creates a shared handle that runs `on_cancel` when cancelled.
    #[must_use]
    pub fn handle<F>(on_cancel: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        Arc::new(Self::new(on_cancel))
    }

    /// Returns true once the closure has been consumed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.on_cancel.lock().is_none()
    }
}

impl AsyncTask for FnTask {
    fn cancel(&self) {
        let callback = self.on_cancel.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl fmt::Debug for FnTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Flag-backed cancellation handle.
///
/// Clones share the same flag. Producers that run a loop or a blocking
/// operation in steps check [`is_cancelled`](Self::is_cancelled) between
/// steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the "not cancelled" state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Returns a shared handle that cancels this token.
    #[must_use]
    pub fn handle(&self) -> TaskHandle {
        Arc::new(self.clone())
    }
}

impl AsyncTask for CancelToken {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
