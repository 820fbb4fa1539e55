//! Deterministic, manually drained job queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::runtime::config::ContextConfig;
use crate::runtime::context::{ExecutionContext, Executor, Job};

/// A FIFO of jobs that only runs when asked.
///
/// Nothing executes until [`run_one`](Self::run_one) or
/// [`run_until_idle`](Self::run_until_idle) is called, which makes
/// interleavings reproducible. Clones share the queue.
#[derive(Clone, Default)]
pub struct ManualQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl ManualQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps this queue in an execution context with default configuration.
    #[must_use]
    pub fn context(&self, name: impl Into<String>) -> ExecutionContext {
        ExecutionContext::from_parts(ContextConfig::named(name), Arc::new(self.clone()))
    }

    /// Runs the oldest queued job. Returns false if the queue was empty.
    pub fn run_one(&self) -> bool {
        let job = self.jobs.lock().pop_front();
        job.map_or(false, |job| {
            job();
            true
        })
    }

    /// Runs jobs until the queue is empty, including jobs queued by jobs.
    ///
    /// Returns the number of jobs run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }

    /// Returns the number of queued jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Returns true if no jobs are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

impl Executor for ManualQueue {
    fn execute(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }
}

impl fmt::Debug for ManualQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualQueue")
            .field("queued", &self.len())
            .finish()
    }
}
