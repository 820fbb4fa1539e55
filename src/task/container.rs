//! Bulk cancellation of a group of tasks.

use std::fmt;

use parking_lot::Mutex;

use super::{AsyncTask, TaskHandle};
use crate::types::CancelReason;

/// An unordered collection of task handles.
///
/// Keeps transient tasks alive for as long as a scope needs them and cancels
/// all of them together. The fan-in combinator uses one to cancel every
/// input at once, and the async bridge uses one scoped to a single
/// suspension.
///
/// Once [`cancel_all`](Self::cancel_all) has run, handles added later are
/// cancelled on arrival.
#[derive(Default)]
pub struct AsyncTaskContainer {
    state: Mutex<ContainerState>,
}

#[derive(Default)]
struct ContainerState {
    tasks: Vec<TaskHandle>,
    cancelled: Option<CancelReason>,
}

impl AsyncTaskContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task to the container.
    pub fn add(&self, task: TaskHandle) {
        let mut state = self.state.lock();
        if let Some(reason) = state.cancelled.clone() {
            drop(state);
            task.cancel_with(&reason);
            return;
        }
        state.tasks.push(task);
    }

    /// Cancels every task currently held and empties the container.
    pub fn cancel_all(&self) {
        self.cancel_all_with(&CancelReason::default());
    }

    /// Cancels every task with the given reason and empties the container.
    pub fn cancel_all_with(&self, reason: &CancelReason) {
        let tasks = {
            let mut state = self.state.lock();
            state.cancelled.get_or_insert_with(|| reason.clone());
            std::mem::take(&mut state.tasks)
        };
        for task in tasks {
            task.cancel_with(reason);
        }
    }

    /// Releases every handle without cancelling it.
    pub fn release_all(&self) {
        let tasks = std::mem::take(&mut self.state.lock().tasks);
        drop(tasks);
    }

    /// Returns true if the container holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    /// Returns the number of tasks held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }
}

impl AsyncTask for AsyncTaskContainer {
    fn cancel(&self) {
        self.cancel_all();
    }

    fn cancel_with(&self, reason: &CancelReason) {
        self.cancel_all_with(reason);
    }
}

impl fmt::Debug for AsyncTaskContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AsyncTaskContainer")
            .field("len", &state.tasks.len())
            .field("cancelled", &state.cancelled)
            .finish()
    }
}
