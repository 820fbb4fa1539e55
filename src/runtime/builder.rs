//! Execution context builder.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::runtime::config::{ContextConfig, UnobservedFailure};
use crate::runtime::context::{ExecutionContext, Executor, Inline};
use crate::runtime::env_config;
use crate::runtime::queue::ManualQueue;
use crate::runtime::serial_queue::SerialQueue;
use crate::tracing_compat::debug;

#[derive(Clone)]
enum ExecutorChoice {
    Inline,
    Serial,
    Custom(Arc<dyn Executor>),
}

impl ExecutorChoice {
    const fn label(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Serial => "serial",
            Self::Custom(_) => "custom",
        }
    }
}

/// Builder for constructing an execution context with custom configuration.
///
/// Programmatic settings win over environment variables, which win over a
/// config file, which wins over defaults.
#[derive(Clone)]
pub struct ContextBuilder {
    name: String,
    executor: ExecutorChoice,
    unobserved_failure: Option<UnobservedFailure>,
    thread_name_prefix: Option<String>,
    env_overrides: bool,
    #[cfg(feature = "config-file")]
    config_file: Option<std::path::PathBuf>,
}

impl ContextBuilder {
    /// Create a new builder for an inline context with default configuration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executor: ExecutorChoice::Inline,
            unobserved_failure: None,
            thread_name_prefix: None,
            env_overrides: false,
            #[cfg(feature = "config-file")]
            config_file: None,
        }
    }

    /// Run jobs on a caller-supplied executor.
    #[must_use]
    pub fn executor(mut self, executor: impl Executor) -> Self {
        self.executor = ExecutorChoice::Custom(Arc::new(executor));
        self
    }

    /// Run jobs on a dedicated worker thread spawned at build time.
    #[must_use]
    pub fn serial_queue(mut self) -> Self {
        self.executor = ExecutorChoice::Serial;
        self
    }

    /// Run jobs on a manually drained queue.
    #[must_use]
    pub fn manual_queue(mut self, queue: ManualQueue) -> Self {
        self.executor = ExecutorChoice::Custom(Arc::new(queue));
        self
    }

    /// Set the policy for failures nobody observed.
    #[must_use]
    pub fn unobserved_failure(mut self, policy: UnobservedFailure) -> Self {
        self.unobserved_failure = Some(policy);
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    /// Apply `TETHER_*` environment variables at build time.
    ///
    /// Settings made through builder methods still take precedence.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.env_overrides = true;
        self
    }

    /// Load settings from a TOML file at build time.
    #[cfg(feature = "config-file")]
    #[must_use]
    pub fn config_file(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Resolve the configuration without building an executor.
    pub fn resolve_config(&self) -> Result<ContextConfig, Error> {
        let mut config = ContextConfig::named(self.name.clone());

        #[cfg(feature = "config-file")]
        if let Some(path) = &self.config_file {
            let parsed = env_config::parse_toml_file(path)?;
            env_config::apply_toml_config(&mut config, &parsed)?;
        }

        if self.env_overrides {
            env_config::apply_env_overrides(&mut config)?;
        }
        if let Some(policy) = self.unobserved_failure {
            config.unobserved_failure = policy;
        }
        if let Some(prefix) = &self.thread_name_prefix {
            config.thread_name_prefix.clone_from(prefix);
        }
        config.normalize();
        Ok(config)
    }

    /// Build an execution context from this configuration.
    pub fn build(self) -> Result<ExecutionContext, Error> {
        let config = self.resolve_config()?;
        debug!(
            context = %config.name,
            executor = self.executor.label(),
            unobserved_failure = %config.unobserved_failure,
            "building execution context"
        );
        match self.executor {
            ExecutorChoice::Inline => Ok(ExecutionContext::from_parts(config, Arc::new(Inline))),
            ExecutorChoice::Serial => SerialQueue::context(config),
            ExecutorChoice::Custom(executor) => Ok(ExecutionContext::from_parts(config, executor)),
        }
    }
}

impl fmt::Debug for ContextBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextBuilder")
            .field("name", &self.name)
            .field("executor", &self.executor.label())
            .field("unobserved_failure", &self.unobserved_failure)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("env_overrides", &self.env_overrides)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::env_config::{ENV_THREAD_NAME_PREFIX, ENV_UNOBSERVED_FAILURE};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clear_env() {
        std::env::remove_var(ENV_UNOBSERVED_FAILURE);
        std::env::remove_var(ENV_THREAD_NAME_PREFIX);
    }

    #[test]
    fn defaults_build_inline_context() {
        let ctx = ContextBuilder::new("plain").build().unwrap();
        assert_eq!(ctx.name(), "plain");
        assert_eq!(ctx.unobserved_failure(), UnobservedFailure::Log);

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        ctx.dispatch(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_queue_defers_jobs() {
        let queue = ManualQueue::new();
        let ctx = ContextBuilder::new("deferred")
            .manual_queue(queue.clone())
            .build()
            .unwrap();
        ctx.dispatch(|| {});
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.run_until_idle(), 1);
    }

    #[test]
    fn programmatic_beats_environment() {
        let _guard = crate::test_utils::env_lock();
        clear_env();
        std::env::set_var(ENV_UNOBSERVED_FAILURE, "silent");
        std::env::set_var(ENV_THREAD_NAME_PREFIX, "env");

        let config = ContextBuilder::new("mixed")
            .with_env_overrides()
            .unobserved_failure(UnobservedFailure::Panic)
            .resolve_config();
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.unobserved_failure, UnobservedFailure::Panic);
        assert_eq!(config.thread_name_prefix, "env");
    }

    #[test]
    fn environment_ignored_without_opt_in() {
        let _guard = crate::test_utils::env_lock();
        clear_env();
        std::env::set_var(ENV_UNOBSERVED_FAILURE, "silent");
        let config = ContextBuilder::new("plain").resolve_config();
        clear_env();
        assert_eq!(config.unwrap().unobserved_failure, UnobservedFailure::Log);
    }

    #[test]
    fn invalid_environment_fails_build() {
        let _guard = crate::test_utils::env_lock();
        clear_env();
        std::env::set_var(ENV_UNOBSERVED_FAILURE, "sometimes");
        let result = ContextBuilder::new("bad").with_env_overrides().build();
        clear_env();
        let err = result.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidConfiguration);
    }

    #[test]
    fn serial_queue_uses_prefix() {
        let ctx = ContextBuilder::new("worker")
            .serial_queue()
            .thread_name_prefix("svc")
            .build()
            .unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        ctx.dispatch(move || {
            let name = std::thread::current().name().map(str::to_owned);
            tx.send(name).unwrap();
        });
        let name = rx.recv().unwrap().unwrap();
        assert!(name.starts_with("svc-worker-"), "{name}");
    }
}
