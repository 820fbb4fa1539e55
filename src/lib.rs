//! Tether: cancel-correct callback promises for Rust.
//!
//! # Overview
//!
//! A [`Promise`] is a lazy, single-shot computation that produces one value
//! or one failure. Producers are callbacks: they receive a [`Deliver`] and
//! return an optional cancellation handle for the work they started. Chains
//! are built with combinators and run on caller-supplied execution contexts.
//!
//! # Core Guarantees
//!
//! - **At most once**: a producer runs at most once, and only when its chain starts
//! - **Exactly one terminal delivery**: a node settles or is cancelled, never both
//! - **Race-free cancellation**: a delivery that loses to cancellation is discarded
//! - **Upstream propagation**: cancelling any node cancels the running operation behind it
//! - **Cleanup on every path**: `always` handlers run on success, failure and cancellation
//! - **Run-once multicast**: [`RunOnce`] starts its producer once and shares the outcome
//!
//! # Module Structure
//!
//! - [`promise`]: [`Promise`], [`Deliver`], chain combinators and terminals
//! - [`task`]: cancellation handles ([`AsyncTask`], [`AsyncTaskContainer`])
//! - [`runtime`]: execution contexts, executors and their configuration
//! - [`sync`]: [`RunOnce`] memoization
//! - [`combinator`]: fan-in of many promises
//! - [`bridge`]: conversions to and from native futures
//! - [`types`]: outcomes, cancellation reasons, identifiers
//! - [`error`]: error types
//! - [`tracing_compat`]: optional structured logging
//!
//! # Example
//!
//! ```ignore
//! use tether::prelude::*;
//!
//! let io = ContextBuilder::new("io").serial_queue().build()?;
//! let profile = Promise::once(io.clone(), |deliver| {
//!     deliver.resolve(load_profile());
//!     None
//! });
//!
//! let task = profile
//!     .sink()
//!     .map(|p| p.display_name)
//!     .tap_error(|err| eprintln!("profile failed: {err}"))
//!     .finally(|name| println!("hello {name}"));
//!
//! // Later, if the result is no longer needed:
//! task.cancel();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

pub mod bridge;
pub mod combinator;
pub mod error;
pub mod promise;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod tracing_compat;
pub mod types;
pub(crate) mod util;

#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use bridge::Awaitable;
pub use combinator::queue::queue;
pub use error::{Error, ErrorCategory, ErrorContext, ErrorKind, Result, ResultExt};
pub use promise::{Deliver, Promise, SharedDeliver};
pub use runtime::{
    ContextBuilder, ContextConfig, ExecutionContext, Executor, Inline, ManualQueue, SerialQueue,
    UnobservedFailure,
};
pub use sync::RunOnce;
pub use task::{AsyncTask, AsyncTaskContainer, CancelToken, FnTask, SerialTask, TaskHandle};
pub use types::{CancelKind, CancelReason, Outcome, PromiseId};

/// Everything needed to build and consume promise chains.
///
/// ```ignore
/// use tether::prelude::*;
/// ```
pub mod prelude {
    // -- Promises --
    pub use crate::promise::{Deliver, Promise, SharedDeliver};
    pub use crate::sync::RunOnce;

    // -- Cancellation --
    pub use crate::task::{AsyncTask, AsyncTaskContainer, CancelToken, FnTask, TaskHandle};
    pub use crate::types::{CancelReason, Outcome};

    // -- Contexts --
    pub use crate::runtime::{ContextBuilder, ExecutionContext, ManualQueue, UnobservedFailure};

    // -- Errors --
    pub use crate::error::{Error, ErrorKind, Result};
}
