//! Promise to future: await a promise chain.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::promise::Promise;
use crate::task::AsyncTaskContainer;
use crate::tracing_compat::trace;
use crate::types::{CancelReason, Outcome};

struct Slot<T> {
    outcome: Option<Outcome<T>>,
    waker: Option<Waker>,
}

enum State<T: Send + 'static> {
    Idle(Promise<T>),
    Waiting {
        slot: Arc<Mutex<Slot<T>>>,
        tasks: AsyncTaskContainer,
    },
    Done,
}

/// A future resolving to a promise's result.
///
/// The chain starts on first poll. Dropping the future before it completes
/// cancels the chain with [`CancelKind::Dropped`]; a chain cancelled by other
/// means resolves to an [`ErrorKind::Cancelled`] error.
///
/// [`CancelKind::Dropped`]: crate::types::CancelKind::Dropped
/// [`ErrorKind::Cancelled`]: crate::error::ErrorKind::Cancelled
#[must_use = "futures do nothing unless polled"]
pub struct Awaitable<T: Send + 'static> {
    state: State<T>,
}

impl<T: Send + 'static> Awaitable<T> {
    pub(crate) fn new(promise: Promise<T>) -> Self {
        Self {
            state: State::Idle(promise),
        }
    }

    fn start(promise: Promise<T>) -> State<T> {
        let slot = Arc::new(Mutex::new(Slot {
            outcome: None,
            waker: None,
        }));
        let filled = Arc::clone(&slot);
        let prepared = promise.prepare(Box::new(move |outcome| {
            let waker = {
                let mut slot = filled.lock();
                slot.outcome = Some(outcome);
                slot.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        }));

        let tasks = AsyncTaskContainer::new();
        tasks.add(prepared.handle());
        prepared.launch();
        State::Waiting { slot, tasks }
    }
}

// Nothing is structurally pinned; the promise and its result are only moved.
impl<T: Send + 'static> Unpin for Awaitable<T> {}

impl<T: Send + 'static> Future for Awaitable<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if matches!(this.state, State::Idle(_)) {
            if let State::Idle(promise) = std::mem::replace(&mut this.state, State::Done) {
                trace!(promise_id = %promise.id(), "awaiting promise");
                this.state = Self::start(promise);
            }
        }

        let State::Waiting { slot, tasks } = &this.state else {
            return Poll::Ready(Err(Error::internal("awaitable polled after completion")));
        };

        let outcome = {
            let mut slot = slot.lock();
            match slot.outcome.take() {
                Some(outcome) => outcome,
                None => {
                    match &slot.waker {
                        Some(waker) if waker.will_wake(cx.waker()) => {}
                        _ => slot.waker = Some(cx.waker().clone()),
                    }
                    return Poll::Pending;
                }
            }
        };

        tasks.release_all();
        this.state = State::Done;
        Poll::Ready(outcome.into_result())
    }
}

impl<T: Send + 'static> Drop for Awaitable<T> {
    fn drop(&mut self) {
        if let State::Waiting { tasks, .. } = &self.state {
            trace!("awaitable dropped before completion, cancelling chain");
            tasks.cancel_all_with(&CancelReason::dropped());
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Awaitable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Idle(_) => "idle",
            State::Waiting { .. } => "waiting",
            State::Done => "done",
        };
        f.debug_struct("Awaitable").field("state", &state).finish()
    }
}

impl<T: Send + 'static> Promise<T> {
    /// Returns a future that starts this chain and resolves to its result.
    ///
    /// Failures come back verbatim as `Err`. Dropping the future cancels the
    /// chain.
    pub fn awaitable_result(self) -> Awaitable<T> {
        Awaitable::new(self)
    }
}

impl<T: Send + 'static> IntoFuture for Promise<T> {
    type Output = Result<T>;
    type IntoFuture = Awaitable<T>;

    fn into_future(self) -> Self::IntoFuture {
        self.awaitable_result()
    }
}
