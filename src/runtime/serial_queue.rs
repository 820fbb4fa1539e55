//! A single named worker thread draining a FIFO of jobs.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use crate::error::Error;
use crate::runtime::config::ContextConfig;
use crate::runtime::context::{ExecutionContext, Executor, Job};
use crate::tracing_compat::{debug, trace};
use crate::util::panic::catch_panic;

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(0);

/// Runs jobs one at a time, in submission order, on a dedicated thread.
///
/// The worker exits once every handle is dropped and the queue has drained.
/// A panicking job is logged and the worker keeps going.
pub struct SerialQueue {
    sender: mpsc::Sender<Job>,
    thread_name: String,
}

impl SerialQueue {
    /// Spawns the worker thread, named `{prefix}-{name}-{n}`.
    pub fn spawn(prefix: &str, name: &str) -> Result<Self, Error> {
        let id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
        let thread_name = format!("{prefix}-{name}-{id}");
        let (sender, receiver) = mpsc::channel::<Job>();

        std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_worker(&receiver))
            .map_err(|e| {
                Error::internal(format!("failed to spawn worker thread {thread_name}: {e}"))
            })?;

        debug!(thread = %thread_name, "serial queue started");
        Ok(Self {
            sender,
            thread_name,
        })
    }

    /// Spawns a worker and wraps it in an execution context.
    pub fn context(config: ContextConfig) -> Result<ExecutionContext, Error> {
        let queue = Self::spawn(&config.thread_name_prefix, &config.name)?;
        Ok(ExecutionContext::from_parts(config, Arc::new(queue)))
    }

    /// Returns the worker thread's name.
    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

fn run_worker(receiver: &mpsc::Receiver<Job>) {
    while let Ok(job) = receiver.recv() {
        // The panic is already logged by the capture helper.
        let _ = catch_panic(job);
    }
    trace!("serial queue drained, worker exiting");
}

impl Executor for SerialQueue {
    fn execute(&self, job: Job) {
        if let Err(mpsc::SendError(job)) = self.sender.send(job) {
            // Only reachable if the worker died; run the job here rather than drop it.
            job();
        }
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}
