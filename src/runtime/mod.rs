//! Execution contexts and their configuration.
//!
//! - [`context`]: the [`Executor`] trait, [`ExecutionContext`] handles and the
//!   [`Inline`] executor
//! - [`queue`]: [`ManualQueue`], a deterministic queue drained on demand
//! - [`serial_queue`]: [`SerialQueue`], a single named worker thread
//! - [`config`]: per-context settings
//! - [`env_config`]: `TETHER_*` environment variables and TOML files
//! - [`builder`]: [`ContextBuilder`]
//!
//! # Context Builder
//!
//! ```ignore
//! use tether::runtime::{ContextBuilder, UnobservedFailure};
//!
//! let io = ContextBuilder::new("io")
//!     .serial_queue()
//!     .unobserved_failure(UnobservedFailure::Panic)
//!     .with_env_overrides()
//!     .build()?;
//! ```
//!
//! # Deterministic Tests
//!
//! ```ignore
//! use tether::runtime::ManualQueue;
//!
//! let queue = ManualQueue::new();
//! let ctx = queue.context("test");
//! // build a chain on `ctx`, start it, then:
//! queue.run_until_idle();
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod env_config;
pub mod queue;
pub mod serial_queue;

pub use builder::ContextBuilder;
pub use config::{ContextConfig, UnobservedFailure};
pub use env_config::ConfigError;
pub use context::{ExecutionContext, Executor, Inline, Job};
pub use queue::ManualQueue;
pub use serial_queue::SerialQueue;
