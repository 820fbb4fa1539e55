//! Chain combinators.
//!
//! Each combinator wraps its receiver in a new lazy promise. Starting the new
//! promise starts the receiver with a continuation that feeds the new node,
//! and the receiver's node becomes the new node's active handle, which is how
//! cancellation travels upstream.

use std::sync::Arc;

use super::{Deliver, Promise};
use crate::error::{Error, Result};
use crate::runtime::ExecutionContext;
use crate::task::{SerialTask, TaskHandle};
use crate::types::Outcome;
use crate::util::panic::catch_panic;

impl<T: Send + 'static> Promise<T> {
    /// Wraps this promise in a node on `ctx` that receives its outcome
    /// through `on_outcome`.
    fn derive<U, F>(self, ctx: ExecutionContext, on_outcome: F) -> Promise<U>
    where
        U: Send + 'static,
        F: FnOnce(Outcome<T>, Deliver<U>) + Send + 'static,
    {
        Promise::derived(ctx, move |deliver| {
            Some(self.start(Box::new(move |outcome| on_outcome(outcome, deliver))))
        })
    }

    /// Transforms the success value.
    ///
    /// A failure passes through without calling `f`. A panic in `f` fails
    /// the derived promise.
    pub fn map<U, F>(self, f: F) -> Promise<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let ctx = self.ctx.clone();
        self.derive(ctx, move |outcome, deliver| match outcome {
            Outcome::Ok(value) => deliver.complete(catch_panic(move || f(value))),
            Outcome::Err(err) => deliver.reject(err),
            Outcome::Cancelled(reason) => deliver.forward(Outcome::Cancelled(reason)),
        })
    }

    /// Transforms the success value with a fallible function.
    ///
    /// An `Err` returned by `f` fails the derived promise.
    pub fn try_map<U, F>(self, f: F) -> Promise<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let ctx = self.ctx.clone();
        self.derive(ctx, move |outcome, deliver| match outcome {
            Outcome::Ok(value) => deliver.complete(catch_panic(move || f(value)).and_then(|r| r)),
            Outcome::Err(err) => deliver.reject(err),
            Outcome::Cancelled(reason) => deliver.forward(Outcome::Cancelled(reason)),
        })
    }

    /// Continues the chain with the promise returned by `f`.
    ///
    /// Cancelling the derived promise cancels this promise while it is
    /// pending, and the inner promise once `f` has produced it.
    pub fn flat_map<U, F>(self, f: F) -> Promise<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Promise<U> + Send + 'static,
    {
        let ctx = self.ctx.clone();
        Promise::derived(ctx, move |deliver: Deliver<U>| {
            let serial = Arc::new(SerialTask::new());
            let target = Arc::clone(&serial);
            let outer = self.prepare(Box::new(move |outcome| match outcome {
                Outcome::Ok(value) => match catch_panic(move || f(value)) {
                    Ok(inner) => {
                        let inner = inner.prepare(Box::new(move |outcome| deliver.forward(outcome)));
                        target.replace(inner.handle());
                        inner.launch();
                    }
                    Err(err) => deliver.reject(err),
                },
                Outcome::Err(err) => deliver.reject(err),
                Outcome::Cancelled(reason) => deliver.forward(Outcome::Cancelled(reason)),
            }));
            serial.replace(outer.handle());
            outer.launch();
            Some(serial as TaskHandle)
        })
    }

    /// Observes a failure without consuming it.
    ///
    /// `handler` runs on failure, then the same failure continues downstream,
    /// marked as observed so a terminal `finally` does not report it again.
    pub fn tap_error<F>(self, handler: F) -> Self
    where
        F: FnOnce(&Error) + Send + 'static,
    {
        let ctx = self.ctx.clone();
        self.derive(ctx, move |outcome, deliver| match outcome {
            Outcome::Err(mut err) => {
                let _ = catch_panic(|| handler(&err));
                err.mark_observed();
                deliver.reject(err);
            }
            other => deliver.forward(other),
        })
    }

    /// Runs `handler` on every exit path: success, failure and cancellation.
    ///
    /// The outcome continues downstream unchanged.
    pub fn always<F>(self, handler: F) -> Self
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        let ctx = self.ctx.clone();
        self.derive(ctx, move |outcome, deliver| {
            let _ = catch_panic(|| handler(&outcome));
            deliver.forward(outcome);
        })
    }

    /// Runs every continuation downstream of this point on `ctx`.
    ///
    /// Upstream producers keep running where they were.
    pub fn hop(self, ctx: ExecutionContext) -> Self {
        self.derive(ctx, |outcome, deliver| deliver.forward(outcome))
    }
}
