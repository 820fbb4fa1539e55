//! Terminal consumers.
//!
//! A terminal starts the chain and returns the handle that cancels it. The
//! handle refers to the last node of the chain; cancelling it cancels the
//! nearest upstream work that is still running.

use super::Promise;
use crate::error::Error;
use crate::runtime::{ExecutionContext, UnobservedFailure};
use crate::task::TaskHandle;
use crate::tracing_compat::{trace, warn};
use crate::types::Outcome;
use crate::util::panic::catch_panic;

impl<T: Send + 'static> Promise<T> {
    /// Starts the chain and calls `on_success` with its value.
    ///
    /// A failure that no `tap_error` observed is reported according to the
    /// context's [`UnobservedFailure`] policy. Cancellation calls nothing.
    pub fn finally<F>(self, on_success: F) -> TaskHandle
    where
        F: FnOnce(T) + Send + 'static,
    {
        let ctx = self.ctx.clone();
        self.start(Box::new(move |outcome| match outcome {
            Outcome::Ok(value) => {
                let _ = catch_panic(move || on_success(value));
            }
            Outcome::Err(err) => report_unobserved(&ctx, &err),
            Outcome::Cancelled(_) => trace!("chain cancelled before finally"),
        }))
    }

    /// Starts the chain with handlers for both success and failure.
    pub fn sink<S, E>(self, on_success: S, on_failure: E) -> TaskHandle
    where
        S: FnOnce(T) + Send + 'static,
        E: FnOnce(Error) + Send + 'static,
    {
        self.start(Box::new(move |outcome| match outcome {
            Outcome::Ok(value) => {
                let _ = catch_panic(move || on_success(value));
            }
            Outcome::Err(err) => {
                let _ = catch_panic(move || on_failure(err));
            }
            Outcome::Cancelled(_) => trace!("chain cancelled before sink"),
        }))
    }

    /// Starts the chain, handling only failures.
    ///
    /// The terminal form of [`tap_error`](Self::tap_error): success values
    /// are dropped.
    pub fn catch<E>(self, on_failure: E) -> TaskHandle
    where
        E: FnOnce(Error) + Send + 'static,
    {
        self.sink(|_| {}, on_failure)
    }
}

fn report_unobserved(ctx: &ExecutionContext, err: &Error) {
    if err.is_observed() {
        return;
    }
    match ctx.unobserved_failure() {
        UnobservedFailure::Silent => {}
        UnobservedFailure::Log => {
            warn!(
                context = ctx.name(),
                promise_id = ?err.context().promise_id,
                error = %err,
                "promise failure reached finally without a handler"
            );
        }
        UnobservedFailure::Panic => {
            panic!("promise failure reached finally without a handler: {err}");
        }
    }
}
