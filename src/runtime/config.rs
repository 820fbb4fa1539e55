//! Execution-context configuration types.
//!
//! These types hold the concrete values that drive per-context behavior. In
//! most cases you should use [`ContextBuilder`](super::builder::ContextBuilder)
//! to construct a context rather than creating a [`ContextConfig`] directly.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `name` | `"inline"` |
//! | `unobserved_failure` | [`UnobservedFailure::Log`] |
//! | `thread_name_prefix` | `"tether"` |

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Default prefix for worker threads spawned by a serial queue.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "tether";

/// Response policy when a failure reaches a terminal consumer that has no
/// failure handler and nothing upstream observed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnobservedFailure {
    /// Panic with the failure details.
    Panic,
    /// Log the failure at `warn` and continue.
    #[default]
    Log,
    /// Drop the failure without reporting.
    Silent,
}

impl UnobservedFailure {
    /// Returns the lowercase name used in env vars and config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Panic => "panic",
            Self::Log => "log",
            Self::Silent => "silent",
        }
    }
}

impl fmt::Display for UnobservedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnobservedFailure {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "panic" => Ok(Self::Panic),
            "log" => Ok(Self::Log),
            "silent" => Ok(Self::Silent),
            other => Err(Error::invalid_configuration(format!(
                "unknown unobserved failure policy {other:?} (expected log, panic or silent)"
            ))),
        }
    }
}

/// Execution-context configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// Name shown in diagnostics.
    pub name: String,
    /// What a terminal `finally` does with an unobserved failure.
    pub unobserved_failure: UnobservedFailure,
    /// Name prefix for worker threads.
    pub thread_name_prefix: String,
}

impl ContextConfig {
    /// Creates the default configuration with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Normalize configuration values to safe defaults.
    pub fn normalize(&mut self) {
        if self.name.is_empty() {
            self.name = "unnamed".to_string();
        }
        if self.thread_name_prefix.is_empty() {
            self.thread_name_prefix = DEFAULT_THREAD_NAME_PREFIX.to_string();
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            name: "inline".to_string(),
            unobserved_failure: UnobservedFailure::Log,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}
