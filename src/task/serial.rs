//! A cancellation handle whose target changes over time.

use std::fmt;

use parking_lot::Mutex;

use super::{AsyncTask, TaskHandle};
use crate::types::CancelReason;

#[derive(Default)]
struct SerialState {
    current: Option<TaskHandle>,
    cancelled: Option<CancelReason>,
}

/// Forwards cancellation to whichever handle is current.
///
/// `flat_map` uses this to point cancellation first at the outer promise and
/// then, once the outer value arrives, at the inner promise. Replacing the
/// target after cancellation cancels the new target immediately, so a handle
/// that arrives late is never left running.
#[derive(Default)]
pub struct SerialTask {
    state: Mutex<SerialState>,
}

impl SerialTask {
    /// Creates an empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `task` the current target.
    ///
    /// The previous target is released without being cancelled.
    pub fn replace(&self, task: TaskHandle) {
        let mut state = self.state.lock();
        if let Some(reason) = state.cancelled.clone() {
            drop(state);
            task.cancel_with(&reason);
            return;
        }
        let previous = state.current.replace(task);
        drop(state);
        drop(previous);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled.is_some()
    }
}

impl AsyncTask for SerialTask {
    fn cancel(&self) {
        self.cancel_with(&CancelReason::default());
    }

    fn cancel_with(&self, reason: &CancelReason) {
        let current = {
            let mut state = self.state.lock();
            if state.cancelled.is_some() {
                return;
            }
            state.cancelled = Some(reason.clone());
            state.current.take()
        };
        if let Some(task) = current {
            task.cancel_with(reason);
        }
    }
}

impl fmt::Debug for SerialTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SerialTask")
            .field("has_target", &state.current.is_some())
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::CancelToken;

    #[test]
    fn cancel_reaches_current_target_only() {
        let serial = SerialTask::new();
        let first = CancelToken::new();
        let second = CancelToken::new();

        serial.replace(first.handle());
        serial.replace(second.handle());
        serial.cancel();

        assert!(!first.is_cancelled());
        assert!(second.is_cancelled());
    }

    #[test]
    fn replace_after_cancel_cancels_new_target() {
        let serial = SerialTask::new();
        serial.cancel();

        let late = CancelToken::new();
        serial.replace(late.handle());
        assert!(late.is_cancelled());
        assert!(serial.is_cancelled());
    }
}
