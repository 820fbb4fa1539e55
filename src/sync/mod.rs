//! Memoization primitives.
//!
//! - [`RunOnce`]: run a producer at most once and multicast its outcome

mod run_once;

pub use run_once::RunOnce;
