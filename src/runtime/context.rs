//! Execution contexts.
//!
//! An [`ExecutionContext`] is a named handle to something that runs jobs: a
//! queue, a worker thread, or the calling thread itself. Promise producers
//! and continuations are dispatched onto the context current at their point
//! in the chain. The crate never owns a thread pool; callers pick or supply
//! the [`Executor`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::runtime::config::{ContextConfig, UnobservedFailure};

/// A unit of work submitted to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run jobs.
///
/// Implementations must run every submitted job exactly once. Jobs may be
/// submitted from any thread, including from inside a running job.
pub trait Executor: Send + Sync + 'static {
    /// Schedules `job` to run.
    fn execute(&self, job: Job);
}

/// Runs each job immediately on the submitting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl Executor for Inline {
    fn execute(&self, job: Job) {
        job();
    }
}

struct ContextInner {
    config: ContextConfig,
    executor: Arc<dyn Executor>,
}

/// A named, cloneable handle to an executor plus its configuration.
///
/// Clones refer to the same context; [`same_as`](Self::same_as) compares
/// identity.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    /// Creates a context with default configuration around `executor`.
    #[must_use]
    pub fn new(name: impl Into<String>, executor: impl Executor) -> Self {
        Self::from_parts(ContextConfig::named(name), Arc::new(executor))
    }

    pub(crate) fn from_parts(config: ContextConfig, executor: Arc<dyn Executor>) -> Self {
        Self {
            inner: Arc::new(ContextInner { config, executor }),
        }
    }

    /// Returns the shared inline context.
    ///
    /// Already-settled promises use it when no context was named.
    #[must_use]
    pub fn inline() -> Self {
        static INLINE: OnceLock<ExecutionContext> = OnceLock::new();
        INLINE
            .get_or_init(|| Self::from_parts(ContextConfig::default(), Arc::new(Inline)))
            .clone()
    }

    /// Returns the context name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Returns the context configuration.
    #[must_use]
    pub fn config(&self) -> &ContextConfig {
        &self.inner.config
    }

    /// Returns the policy for failures nobody observed.
    #[must_use]
    pub fn unobserved_failure(&self) -> UnobservedFailure {
        self.inner.config.unobserved_failure
    }

    /// Submits a job to this context's executor.
    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.executor.execute(Box::new(job));
    }

    /// Returns true if both handles refer to the same context.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::inline()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.name())
            .field("unobserved_failure", &self.unobserved_failure())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn inline_runs_immediately() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        ExecutionContext::inline().dispatch(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inline_is_shared() {
        let a = ExecutionContext::inline();
        let b = ExecutionContext::default();
        assert!(a.same_as(&b));
        assert_eq!(a.name(), "inline");
    }

    #[test]
    fn distinct_contexts_are_not_same() {
        let a = ExecutionContext::new("a", Inline);
        let b = ExecutionContext::new("a", Inline);
        assert!(!a.same_as(&b));
        assert!(a.same_as(&a.clone()));
        assert!(format!("{a:?}").contains("\"a\""));
    }
}
