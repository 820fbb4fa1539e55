//! Run-once memoization with multicast.
//!
//! [`RunOnce`] wraps one producer and any number of consumers. The producer
//! starts the first time a consumer starts, runs at most once, and its single
//! outcome is multicast to every consumer. After that, new consumers receive
//! an already-settled promise without scheduling anything.
//!
//! # Cancel Safety
//!
//! - Cancelling a consumer removes it from the pending set; the shared run
//!   keeps going for the others and for later consumers.
//! - The shared run cannot be cancelled through a consumer.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::promise::{Deliver, Promise};
use crate::runtime::ExecutionContext;
use crate::task::{FnTask, TaskHandle};
use crate::tracing_compat::debug;
use crate::types::Outcome;
use crate::util::{Arena, ArenaIndex};

enum Phase<T: Send + 'static> {
    NotStarted(Promise<T>),
    Running,
    Resolved(Result<T>),
}

impl<T: Send + 'static> Phase<T> {
    const fn label(&self) -> &'static str {
        match self {
            Self::NotStarted(_) => "not_started",
            Self::Running => "running",
            Self::Resolved(_) => "resolved",
        }
    }
}

struct OnceState<T: Send + 'static> {
    phase: Phase<T>,
    consumers: Arena<Deliver<T>>,
}

struct Inner<T: Send + 'static> {
    ctx: ExecutionContext,
    state: Mutex<OnceState<T>>,
}

impl<T: Clone + Send + 'static> Inner<T> {
    fn new(ctx: ExecutionContext, phase: Phase<T>) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            state: Mutex::new(OnceState {
                phase,
                consumers: Arena::new(),
            }),
        })
    }

    fn subscribe(self: &Arc<Self>, deliver: Deliver<T>) -> Option<TaskHandle> {
        let mut state = self.state.lock();
        if let Phase::Resolved(result) = &state.phase {
            let result = result.clone();
            drop(state);
            deliver.complete(result);
            return None;
        }

        let key = state.consumers.insert(deliver);
        let producer = match std::mem::replace(&mut state.phase, Phase::Running) {
            Phase::NotStarted(producer) => Some(producer),
            previous => {
                state.phase = previous;
                None
            }
        };
        drop(state);

        if let Some(producer) = producer {
            debug!(context = self.ctx.name(), "run-once producer starting");
            let inner = Arc::clone(self);
            // The handle is dropped: consumers cannot cancel the shared run.
            let _ = producer.start(Box::new(move |outcome| inner.publish(outcome)));
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        Some(FnTask::handle(move || {
            if let Some(inner) = weak.upgrade() {
                inner.unsubscribe(key);
            }
        }))
    }

    fn unsubscribe(&self, key: ArenaIndex) {
        let removed = self.state.lock().consumers.remove(key);
        if let Some(deliver) = removed {
            debug!(consumer = ?key, "run-once consumer cancelled");
            deliver.dismiss();
        }
    }

    fn publish(&self, outcome: Outcome<T>) {
        let result = outcome.into_result();
        let consumers = {
            let mut state = self.state.lock();
            state.phase = Phase::Resolved(result.clone());
            state.consumers.drain()
        };
        debug!(
            context = self.ctx.name(),
            consumers = consumers.len(),
            ok = result.is_ok(),
            "run-once multicast"
        );
        for deliver in consumers {
            deliver.complete(result.clone());
        }
    }
}

/// A memoizing multiplexer: one producer run, many consumers.
///
/// Clones share the same run.
pub struct RunOnce<T: Send + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> Clone for RunOnce<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> RunOnce<T> {
    /// Memoizes `promise`. It starts when the first consumer starts.
    pub fn from_promise(promise: Promise<T>) -> Self {
        let ctx = promise.context().clone();
        Self {
            inner: Inner::new(ctx, Phase::NotStarted(promise)),
        }
    }

    /// Creates a run that is already resolved with `result`.
    pub fn resolved(ctx: ExecutionContext, result: Result<T>) -> Self {
        Self {
            inner: Inner::new(ctx, Phase::Resolved(result)),
        }
    }

    /// Returns a fresh promise of the shared outcome.
    ///
    /// Once the run has resolved, the returned promise is already settled.
    pub fn sink(&self) -> Promise<T> {
        if let Some(result) = self.peek() {
            return Promise::ready(self.inner.ctx.clone(), result);
        }
        let inner = Arc::clone(&self.inner);
        Promise::derived(self.inner.ctx.clone(), move |deliver| inner.subscribe(deliver))
    }

    /// Returns true once the single run has settled.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.inner.state.lock().phase, Phase::Resolved(_))
    }

    /// Returns the memoized result.
    ///
    /// Fails with [`ErrorKind::MemoizationUnavailable`] if the run has not
    /// settled yet; otherwise returns the run's value or failure.
    ///
    /// [`ErrorKind::MemoizationUnavailable`]: crate::error::ErrorKind::MemoizationUnavailable
    pub fn retrieve(&self) -> Result<T> {
        self.peek()
            .unwrap_or_else(|| Err(Error::memoization_unavailable()))
    }

    /// Returns the memoized result if the run has settled.
    #[must_use]
    pub fn peek(&self) -> Option<Result<T>> {
        match &self.inner.state.lock().phase {
            Phase::Resolved(result) => Some(result.clone()),
            _ => None,
        }
    }

    /// Returns the number of consumers waiting for the run.
    #[must_use]
    pub fn pending_consumers(&self) -> usize {
        self.inner.state.lock().consumers.len()
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Creates a [`RunOnce`] around a producer running on `ctx`.
    pub fn once<F>(ctx: ExecutionContext, producer: F) -> RunOnce<T>
    where
        F: FnOnce(Deliver<T>) -> Option<TaskHandle> + Send + 'static,
    {
        RunOnce::from_promise(Self::new(ctx, producer))
    }
}

impl<T: Send + 'static> fmt::Debug for RunOnce<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("RunOnce")
            .field("context", &self.inner.ctx.name())
            .field("phase", &state.phase.label())
            .field("pending_consumers", &state.consumers.len())
            .finish()
    }
}
