//! Future to promise: run a native future as a promise producer.
//!
//! The future is polled on the promise's execution context. Wakes re-dispatch
//! a poll job; a small state machine keeps at most one poll job queued or
//! running, so a future that wakes itself while being polled (even on an
//! inline context) is polled again after the current poll returns instead
//! of re-entrantly.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use parking_lot::Mutex;

use crate::error::Result;
use crate::promise::{Deliver, Promise};
use crate::runtime::ExecutionContext;
use crate::task::{AsyncTask, TaskHandle};
use crate::tracing_compat::trace;
use crate::util::panic::catch_panic;

const IDLE: u8 = 0;
const SCHEDULED: u8 = 1;
const RUNNING: u8 = 2;
const NOTIFIED: u8 = 3;
const DONE: u8 = 4;

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

struct FutureTask<T: Send + 'static> {
    ctx: ExecutionContext,
    state: AtomicU8,
    cancelled: AtomicBool,
    future: Mutex<Option<BoxFuture<T>>>,
    deliver: Mutex<Option<Deliver<T>>>,
}

impl<T: Send + 'static> FutureTask<T> {
    fn schedule(self: &Arc<Self>) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next = match current {
                IDLE => SCHEDULED,
                RUNNING => NOTIFIED,
                _ => return,
            };
            match self
                .state
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        if current == IDLE {
            let task = Arc::clone(self);
            self.ctx.dispatch(move || task.run());
        }
    }

    fn run(self: Arc<Self>) {
        if self
            .state
            .compare_exchange(SCHEDULED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let waker = Waker::from(Arc::clone(&self));
        let mut cx = Context::from_waker(&waker);

        loop {
            if self.cancelled.load(Ordering::Acquire) {
                self.finish(None);
                return;
            }

            let polled = {
                let mut slot = self.future.lock();
                let Some(future) = slot.as_mut() else {
                    self.state.store(DONE, Ordering::Release);
                    return;
                };
                catch_panic(|| future.as_mut().poll(&mut cx))
            };

            match polled {
                Ok(Poll::Ready(result)) => {
                    self.finish(Some(result));
                    return;
                }
                Err(panic) => {
                    self.finish(Some(Err(panic)));
                    return;
                }
                Ok(Poll::Pending) => {}
            }

            // Cancelled while the future was locked for polling.
            if self.cancelled.load(Ordering::Acquire) {
                self.finish(None);
                return;
            }

            match self
                .state
                .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                // Woken during the poll: go again.
                Err(_) => self.state.store(RUNNING, Ordering::Release),
            }
        }
    }

    fn finish(&self, result: Option<Result<T>>) {
        self.state.store(DONE, Ordering::Release);
        let future = self.future.lock().take();
        drop(future);
        let deliver = self.deliver.lock().take();
        match (deliver, result) {
            (Some(deliver), Some(result)) => deliver.complete(result),
            (Some(deliver), None) => deliver.dismiss(),
            (None, _) => {}
        }
    }
}

impl<T: Send + 'static> Wake for FutureTask<T> {
    fn wake(self: Arc<Self>) {
        self.schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.schedule();
    }
}

impl<T: Send + 'static> AsyncTask for FutureTask<T> {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        trace!(context = self.ctx.name(), "cancelling native future");
        // A poll in progress drops the future itself once it returns.
        if let Some(mut slot) = self.future.try_lock() {
            let future = slot.take();
            drop(slot);
            drop(future);
        }
        if let Some(deliver) = self.deliver.lock().take() {
            deliver.dismiss();
        }
    }
}

impl<T: Send + 'static> Promise<T> {
    /// Wraps a native future as a promise.
    ///
    /// The future is first polled on `ctx` when the chain starts. Its output
    /// settles the promise; a panic while polling fails it. Cancelling the
    /// promise drops the future.
    pub fn from_future<F>(ctx: ExecutionContext, future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let poll_ctx = ctx.clone();
        Self::new(ctx, move |deliver| {
            let task = Arc::new(FutureTask {
                ctx: poll_ctx,
                state: AtomicU8::new(IDLE),
                cancelled: AtomicBool::new(false),
                future: Mutex::new(Some(Box::pin(future))),
                deliver: Mutex::new(Some(deliver)),
            });
            task.schedule();
            Some(task as TaskHandle)
        })
    }
}
