//! Completion callbacks handed to producers.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::node::Node;
use crate::error::{Error, ErrorKind, Result};
use crate::types::Outcome;

/// One-shot completion callback for a promise producer.
///
/// Consuming `self` on completion means a producer can deliver at most once.
/// Dropping a `Deliver` without completing it settles the promise with
/// [`ErrorKind::Abandoned`], or [`ErrorKind::Panicked`] if the drop happens
/// while the thread is unwinding, so a consumer is never left waiting on a
/// producer that gave up.
#[must_use = "dropping a Deliver settles the promise as abandoned"]
pub struct Deliver<T: Send + 'static> {
    node: Option<Arc<Node<T>>>,
}

impl<T: Send + 'static> Deliver<T> {
    pub(crate) fn new(node: Arc<Node<T>>) -> Self {
        Self { node: Some(node) }
    }

    /// Settles the promise with a value.
    pub fn resolve(self, value: T) {
        self.forward(Outcome::Ok(value));
    }

    /// Settles the promise with a failure.
    pub fn reject(self, error: Error) {
        self.forward(Outcome::Err(error));
    }

    /// Settles the promise with a result.
    pub fn complete(self, result: Result<T>) {
        self.forward(result.into());
    }

    /// Returns true if the promise was cancelled.
    ///
    /// A delivery after cancellation is discarded, so long-running producers
    /// can poll this to stop early.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.node.as_ref().map_or(true, |node| node.is_cancelled())
    }

    /// Converts into a cloneable callback for producers that race several
    /// operations; the first completion wins.
    pub fn share(self) -> SharedDeliver<T> {
        SharedDeliver {
            inner: Arc::new(Mutex::new(Some(self))),
        }
    }

    /// Settles with any outcome, including cancellation.
    pub(crate) fn forward(mut self, outcome: Outcome<T>) {
        if let Some(node) = self.node.take() {
            node.settle(outcome);
        }
    }

    /// Releases the callback without settling.
    ///
    /// Only for callers that know the node is already cancelled.
    pub(crate) fn dismiss(mut self) {
        self.node = None;
    }
}

impl<T: Send + 'static> Drop for Deliver<T> {
    fn drop(&mut self) {
        let Some(node) = self.node.take() else {
            return;
        };
        if !node.is_pending() {
            return;
        }
        let err = if std::thread::panicking() {
            if node.defer_to_producer_panic() {
                return;
            }
            Error::new(ErrorKind::Panicked)
                .with_message("producer panicked before delivering a result")
        } else {
            Error::new(ErrorKind::Abandoned)
                .with_message("producer dropped its completion callback")
        };
        node.settle(Outcome::Err(err));
    }
}

impl<T: Send + 'static> fmt::Debug for Deliver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deliver")
            .field("promise_id", &self.node.as_ref().map(|node| node.id()))
            .finish()
    }
}

/// A cloneable [`Deliver`]: the first completion wins.
///
/// When every clone is dropped without completing, the promise settles as
/// abandoned.
pub struct SharedDeliver<T: Send + 'static> {
    inner: Arc<Mutex<Option<Deliver<T>>>>,
}

impl<T: Send + 'static> Clone for SharedDeliver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> SharedDeliver<T> {
    /// Settles the promise with a result. Returns true if this call won.
    pub fn complete(&self, result: Result<T>) -> bool {
        let deliver = self.inner.lock().take();
        deliver.map_or(false, |deliver| {
            deliver.complete(result);
            true
        })
    }

    /// Settles the promise with a value. Returns true if this call won.
    pub fn resolve(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Settles the promise with a failure. Returns true if this call won.
    pub fn reject(&self, error: Error) -> bool {
        self.complete(Err(error))
    }

    /// Returns true once some clone completed the promise.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Returns true if the promise was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner
            .lock()
            .as_ref()
            .map_or(false, Deliver::is_cancelled)
    }
}

impl<T: Send + 'static> fmt::Debug for SharedDeliver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedDeliver")
            .field("completed", &self.is_completed())
            .finish()
    }
}
