//! Callback promises.
//!
//! A [`Promise`] describes a single eventual value or failure. It is lazy:
//! building one, or chaining combinators onto it, runs nothing. The work
//! starts when the chain is consumed by a terminal ([`Promise::finally`],
//! [`Promise::sink`], [`Promise::catch`]) or by the async bridge
//! ([`Promise::awaitable_result`]), which return a cancellation handle or a
//! future respectively.
//!
//! # Producers
//!
//! A producer receives a [`Deliver`] and returns an optional
//! [`TaskHandle`] for the work it started. `None` means there is nothing to
//! cancel, typically because the producer completed synchronously.
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let ctx = ExecutionContext::inline();
//! let task = Promise::new(ctx, |deliver| {
//!     deliver.resolve(21);
//!     None
//! })
//! .map(|v| v * 2)
//! .finally(|v| assert_eq!(v, 42));
//! ```
//!
//! # Cancellation
//!
//! Cancelling the handle of any node in a chain cancels that node and, through
//! each node's active handle, every upstream node up to the running operation.
//! A cancelled node never delivers a value; `always` handlers still run with
//! [`Outcome::Cancelled`].

mod chain;
mod deliver;
pub(crate) mod node;
mod terminal;

pub use deliver::{Deliver, SharedDeliver};

use std::fmt;

use crate::error::{Error, Result};
use crate::runtime::ExecutionContext;
use crate::task::TaskHandle;
use crate::types::PromiseId;
use node::{Continuation, Prepared};

/// Boxed producer closure.
pub(crate) type Producer<T> = Box<dyn FnOnce(Deliver<T>) -> Option<TaskHandle> + Send + 'static>;

/// Where a promise's outcome comes from.
pub(crate) enum Source<T: Send + 'static> {
    /// Already settled; launching publishes the result.
    Ready(Result<T>),
    /// Produced by running a closure. `inline` producers run on the thread
    /// that starts the chain instead of being dispatched.
    Producer { run: Producer<T>, inline: bool },
}

/// A lazy, single-shot, chainable computation of a `T` or an [`Error`].
#[must_use = "promises are lazy and do nothing unless consumed"]
pub struct Promise<T: Send + 'static> {
    id: PromiseId,
    ctx: ExecutionContext,
    source: Source<T>,
}

impl<T: Send + 'static> Promise<T> {
    /// Creates a promise whose producer runs on `ctx` when the chain starts.
    ///
    /// The producer runs at most once. If it panics, the promise fails with
    /// [`ErrorKind::Panicked`](crate::error::ErrorKind::Panicked).
    pub fn new<F>(ctx: ExecutionContext, producer: F) -> Self
    where
        F: FnOnce(Deliver<T>) -> Option<TaskHandle> + Send + 'static,
    {
        Self::from_source(
            ctx,
            Source::Producer {
                run: Box::new(producer),
                inline: false,
            },
        )
    }

    /// Creates an already-settled promise on `ctx`.
    pub fn ready(ctx: ExecutionContext, result: Result<T>) -> Self {
        Self::from_source(ctx, Source::Ready(result))
    }

    /// Creates a promise already settled with `value`, on the inline context.
    pub fn success(value: T) -> Self {
        Self::ready(ExecutionContext::inline(), Ok(value))
    }

    /// Creates a promise already settled with `error`, on the inline context.
    pub fn failure(error: Error) -> Self {
        Self::ready(ExecutionContext::inline(), Err(error))
    }

    /// Lifts a synchronous, possibly failing computation into a promise.
    ///
    /// The closure runs on `ctx` when the chain starts.
    pub fn firstly<F>(ctx: ExecutionContext, f: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        Self::new(ctx, move |deliver| {
            deliver.complete(f());
            None
        })
    }

    /// Returns the execution context continuations of this promise run on.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Returns this promise's identifier.
    #[must_use]
    pub fn id(&self) -> PromiseId {
        self.id
    }

    pub(crate) fn from_source(ctx: ExecutionContext, source: Source<T>) -> Self {
        Self {
            id: PromiseId::next(),
            ctx,
            source,
        }
    }

    /// Creates a promise whose producer runs on the starting thread.
    ///
    /// Used by combinators whose producer only starts an upstream chain.
    pub(crate) fn derived<F>(ctx: ExecutionContext, producer: F) -> Self
    where
        F: FnOnce(Deliver<T>) -> Option<TaskHandle> + Send + 'static,
    {
        Self::from_source(
            ctx,
            Source::Producer {
                run: Box::new(producer),
                inline: true,
            },
        )
    }

    /// Attaches `continuation` without starting any work.
    pub(crate) fn prepare(self, continuation: Continuation<T>) -> Prepared<T> {
        Prepared::new(self.id, self.ctx, self.source, continuation)
    }

    /// Starts the chain, sending its outcome to `continuation`.
    pub(crate) fn start(self, continuation: Continuation<T>) -> TaskHandle {
        self.prepare(continuation).launch()
    }
}

impl<T: Send + 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Ready(Ok(_)) => "ready(ok)",
            Source::Ready(Err(_)) => "ready(err)",
            Source::Producer { .. } => "producer",
        };
        f.debug_struct("Promise")
            .field("id", &self.id)
            .field("context", &self.ctx.name())
            .field("source", &source)
            .finish()
    }
}
