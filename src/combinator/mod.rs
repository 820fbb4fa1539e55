//! Combinators over several promises.
//!
//! - [`queue`]: fan-in of an ordered list of promises (wait for all, report
//!   the first failure by input order)

pub mod queue;

pub use queue::{aggregate_outcomes, queue};
