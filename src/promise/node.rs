//! Per-node settlement state machine.
//!
//! A node is created when a promise starts. It owns the continuation that
//! receives the node's single outcome and the cancellation handle of the
//! work currently running on its behalf. Settlement and cancellation race
//! through one mutex; whichever takes the `Pending` state first wins and
//! the loser is discarded.
//!
//! The lock is never held while user code runs: continuations are handed to
//! the node's execution context, and handles are cancelled after the state
//! transition is published.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::deliver::Deliver;
use super::{Producer, Source};
use crate::error::Error;
use crate::runtime::ExecutionContext;
use crate::task::{AsyncTask, TaskHandle};
use crate::tracing_compat::{debug, error, trace};
use crate::types::{CancelReason, Outcome, PromiseId};
use crate::util::panic::panic_message;

/// Receives a node's single outcome.
pub(crate) type Continuation<T> = Box<dyn FnOnce(Outcome<T>) + Send + 'static>;

enum NodeState<T> {
    Pending {
        continuation: Option<Continuation<T>>,
        active: Option<TaskHandle>,
    },
    Settled,
    Cancelled(CancelReason),
}

impl<T> NodeState<T> {
    const fn label(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Settled => "settled",
            Self::Cancelled(_) => "cancelled",
        }
    }
}

pub(crate) struct Node<T> {
    id: PromiseId,
    ctx: ExecutionContext,
    state: Mutex<NodeState<T>>,
    /// Thread running this node's producer, while it runs.
    producer_thread: Mutex<Option<ThreadId>>,
    /// Set when the producer's own panic dropped its `Deliver`.
    unwound: AtomicBool,
}

impl<T: Send + 'static> Node<T> {
    fn new(id: PromiseId, ctx: ExecutionContext, continuation: Continuation<T>) -> Arc<Self> {
        Arc::new(Self {
            id,
            ctx,
            state: Mutex::new(NodeState::Pending {
                continuation: Some(continuation),
                active: None,
            }),
            producer_thread: Mutex::new(None),
            unwound: AtomicBool::new(false),
        })
    }

    pub(crate) fn id(&self) -> PromiseId {
        self.id
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), NodeState::Pending { .. })
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(*self.state.lock(), NodeState::Cancelled(_))
    }

    fn is_settled(&self) -> bool {
        matches!(*self.state.lock(), NodeState::Settled)
    }

    /// Called by a `Deliver` dropped while its thread unwinds. Returns true
    /// if the panic started inside this node's producer on this thread; the
    /// node is then settled by `run_producer` with the panic's own message.
    pub(crate) fn defer_to_producer_panic(&self) -> bool {
        let here = *self.producer_thread.lock() == Some(thread::current().id());
        if here {
            self.unwound.store(true, Ordering::Release);
        }
        here
    }

    /// Publishes the node's outcome. Returns false if the node had already
    /// settled or been cancelled.
    pub(crate) fn settle(&self, outcome: Outcome<T>) -> bool {
        let outcome = match outcome {
            Outcome::Cancelled(reason) => return self.cancel_inner(&reason),
            Outcome::Err(err) => Outcome::Err(err.stamp(self.id)),
            ok @ Outcome::Ok(_) => ok,
        };

        let (continuation, active) = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, NodeState::Settled) {
                NodeState::Pending {
                    continuation,
                    active,
                } => (continuation, active),
                previous => {
                    debug!(
                        promise_id = %self.id,
                        state = previous.label(),
                        outcome = outcome.label(),
                        "late delivery discarded"
                    );
                    *state = previous;
                    return false;
                }
            }
        };

        // Releases the upstream chain.
        drop(active);
        trace!(promise_id = %self.id, outcome = outcome.label(), "promise settled");
        if let Some(continuation) = continuation {
            self.ctx.dispatch(move || continuation(outcome));
        }
        true
    }

    fn cancel_inner(&self, reason: &CancelReason) -> bool {
        let (continuation, active) = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, NodeState::Cancelled(reason.clone())) {
                NodeState::Pending {
                    continuation,
                    active,
                } => (continuation, active),
                previous => {
                    *state = previous;
                    return false;
                }
            }
        };

        debug!(promise_id = %self.id, reason = %reason, "promise cancelled");
        if let Some(active) = active {
            active.cancel_with(reason);
        }
        if let Some(continuation) = continuation {
            let reason = reason.clone();
            self.ctx
                .dispatch(move || continuation(Outcome::Cancelled(reason)));
        }
        true
    }

    /// Records the handle for the work running on this node's behalf.
    ///
    /// A handle that arrives after cancellation is cancelled on receipt; one
    /// that arrives after settlement is released.
    fn set_active(&self, handle: TaskHandle) {
        let mut state = self.state.lock();
        match &mut *state {
            NodeState::Pending { active, .. } => {
                *active = Some(handle);
            }
            NodeState::Cancelled(reason) => {
                let reason = reason.clone();
                drop(state);
                debug!(promise_id = %self.id, "handle arrived after cancellation");
                handle.cancel_with(&reason);
            }
            NodeState::Settled => {
                drop(state);
                drop(handle);
            }
        }
    }

    fn run_producer(self: &Arc<Self>, producer: Producer<T>) {
        if !self.is_pending() {
            trace!(promise_id = %self.id, "producer skipped, node no longer pending");
            return;
        }
        trace!(promise_id = %self.id, context = self.ctx.name(), "promise started");
        let deliver = Deliver::new(Arc::clone(self));
        *self.producer_thread.lock() = Some(thread::current().id());
        let result = panic::catch_unwind(AssertUnwindSafe(move || producer(deliver)));
        *self.producer_thread.lock() = None;
        let unwound = self.unwound.swap(false, Ordering::AcqRel);

        match result {
            Ok(handle) => {
                // A nested producer's panic dropped our callback and was caught there.
                if unwound {
                    self.settle(Outcome::Err(Error::panicked(
                        "producer panicked before delivering a result",
                    )));
                }
                if let Some(handle) = handle {
                    self.set_active(handle);
                }
            }
            // Raised by downstream code that delivery ran inline, such as the
            // unobserved-failure policy in `finally`. Not ours to swallow.
            Err(payload) if self.is_settled() => panic::resume_unwind(payload),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(promise_id = %self.id, panic = %message, "producer panicked");
                self.settle(Outcome::Err(Error::panicked(message)));
            }
        }
    }
}

impl<T: Send + 'static> AsyncTask for Node<T> {
    fn cancel(&self) {
        self.cancel_with(&CancelReason::default());
    }

    fn cancel_with(&self, reason: &CancelReason) {
        self.cancel_inner(reason);
    }
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("context", &self.ctx.name())
            .field("state", &self.state.lock().label())
            .finish()
    }
}

/// A node whose continuation is attached but whose work has not started.
///
/// Splitting start into prepare and launch lets a caller register the
/// node's handle (for example in a [`SerialTask`](crate::task::SerialTask))
/// before a synchronous settlement can observe it.
pub(crate) struct Prepared<T: Send + 'static> {
    node: Arc<Node<T>>,
    source: Source<T>,
}

impl<T: Send + 'static> Prepared<T> {
    pub(crate) fn new(
        id: PromiseId,
        ctx: ExecutionContext,
        source: Source<T>,
        continuation: Continuation<T>,
    ) -> Self {
        Self {
            node: Node::new(id, ctx, continuation),
            source,
        }
    }

    pub(crate) fn handle(&self) -> TaskHandle {
        Arc::clone(&self.node) as TaskHandle
    }

    /// Starts the node's work and returns its cancellation handle.
    pub(crate) fn launch(self) -> TaskHandle {
        let handle = self.handle();
        match self.source {
            Source::Ready(result) => {
                self.node.settle(result.into());
            }
            Source::Producer { run, inline: true } => self.node.run_producer(run),
            Source::Producer { run, inline: false } => {
                let node = self.node;
                let ctx = node.ctx.clone();
                ctx.dispatch(move || node.run_producer(run));
            }
        }
        handle
    }
}
