//! Error types and error handling strategy for tether.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Errors are `Clone`, so one settlement can be multicast to many consumers
//! - Panics inside producers, transforms and handlers are captured and
//!   converted to [`ErrorKind::Panicked`] failures
//! - Cancellation is not an error: a cancelled chain delivers no value. The
//!   [`ErrorKind::Cancelled`] kind only appears where a consumer explicitly
//!   asks for a result (the async bridge, a memoized run that was cancelled)
//!
//! # Error Categories
//!
//! - **Operation**: a producer or transform failed
//! - **Cancellation**: the chain was cancelled before it produced a value
//! - **Aggregate**: one input of a fan-in failed
//! - **Memoization**: a memoized result was requested too early
//! - **Configuration**: invalid execution context configuration
//! - **Internal**: bugs and invalid states

use core::fmt;
use std::sync::Arc;

use crate::types::{CancelReason, PromiseId};

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Operation ===
    /// A producer or transform reported a failure.
    OperationFailed,
    /// A producer, transform or handler panicked.
    Panicked,
    /// The producer dropped its completion callback without delivering.
    Abandoned,

    // === Cancellation ===
    /// The chain was cancelled before a value was delivered.
    Cancelled,

    // === Aggregation ===
    /// At least one input of a fan-in failed.
    AggregateFailure,

    // === Memoization ===
    /// The memoized result was requested before the single run settled.
    MemoizationUnavailable,

    // === Configuration ===
    /// An execution context could not be configured.
    InvalidConfiguration,

    // === Internal ===
    /// Internal error (bug).
    Internal,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::OperationFailed | Self::Panicked | Self::Abandoned => ErrorCategory::Operation,
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::AggregateFailure => ErrorCategory::Aggregate,
            Self::MemoizationUnavailable => ErrorCategory::Memoization,
            Self::InvalidConfiguration => ErrorCategory::Configuration,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Returns true if retrying the same request later may succeed.
    ///
    /// Only an early memoization lookup is known to be transient; everything
    /// else depends on what the producer does.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::MemoizationUnavailable)
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Producer or transform failures.
    Operation,
    /// Cancellation observed by an explicit consumer.
    Cancellation,
    /// Fan-in failures.
    Aggregate,
    /// Memoization lookups.
    Memoization,
    /// Configuration failures.
    Configuration,
    /// Internal errors.
    Internal,
}

/// Diagnostic context for an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The promise node that settled with this error.
    pub promise_id: Option<PromiseId>,
    /// Ordinal of the failing input for fan-in failures.
    pub input_index: Option<usize>,
}

/// The main error type for tether operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    context: ErrorContext,
    observed: bool,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            context: ErrorContext {
                promise_id: None,
                input_index: None,
            },
            observed: false,
        }
    }

    /// Creates an `OperationFailed` error carrying the given cause text.
    #[must_use]
    pub fn failed(cause: impl Into<String>) -> Self {
        Self::new(ErrorKind::OperationFailed).with_message(cause)
    }

    /// Wraps an arbitrary error as an `OperationFailed` cause.
    ///
    /// The source's text becomes the message and the source itself stays
    /// reachable through [`std::error::Error::source`].
    #[must_use]
    pub fn operation(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        let message = source.to_string();
        Self::new(ErrorKind::OperationFailed)
            .with_message(message)
            .with_source(source)
    }

    /// Creates a panic error from a captured panic message.
    #[must_use]
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Panicked).with_message(message)
    }

    /// Creates a cancellation error from a structured reason.
    #[must_use]
    pub fn cancelled(reason: &CancelReason) -> Self {
        Self::new(ErrorKind::Cancelled).with_message(format!("{reason}"))
    }

    /// Creates a fan-in failure for the input at `index`.
    #[must_use]
    pub fn aggregate(index: usize, cause: Self) -> Self {
        let message = format!("input #{index} failed: {cause}");
        let mut err = Self::new(ErrorKind::AggregateFailure)
            .with_message(message)
            .with_source(cause);
        err.context.input_index = Some(index);
        err
    }

    /// Creates an error for a memoized value that is not available yet.
    #[must_use]
    pub fn memoization_unavailable() -> Self {
        Self::new(ErrorKind::MemoizationUnavailable)
            .with_message("run-once result requested before the single execution settled")
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn invalid_configuration(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfiguration).with_message(detail)
    }

    /// Creates an internal error (bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns true if this error represents cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Returns true if this error came from a captured panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self.kind, ErrorKind::Panicked)
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds structured context to the error.
    #[must_use]
    pub fn with_context(mut self, ctx: ErrorContext) -> Self {
        self.context = ctx;
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the error context.
    #[must_use]
    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    /// Returns the failing input ordinal of a fan-in failure.
    #[must_use]
    pub fn failed_input(&self) -> Option<usize> {
        self.context.input_index
    }

    /// Returns the direct cause when it is itself a tether error.
    #[must_use]
    pub fn cause(&self) -> Option<&Self> {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<Self>())
    }

    /// Returns true if an intermediate error handler already saw this error.
    #[must_use]
    pub const fn is_observed(&self) -> bool {
        self.observed
    }

    pub(crate) fn mark_observed(&mut self) {
        self.observed = true;
    }

    pub(crate) fn stamp(mut self, id: PromiseId) -> Self {
        if self.context.promise_id.is_none() {
            self.context.promise_id = Some(id);
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl PartialEq for Error {
    /// Two errors are equal when kind and message agree; sources and context
    /// are diagnostic only.
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}

impl Eq for Error {}

/// Extension trait for adding context to Results.
#[allow(clippy::result_large_err)]
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Attach context message computed lazily on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_message(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_message(f()))
    }
}

/// A specialized Result type for tether operations.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;
