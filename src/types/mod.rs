//! Core types shared by every part of tether.
//!
//! - [`id`]: Identifier type for promise nodes
//! - [`outcome`]: Three-valued settlement of a node (ok, failed, cancelled)
//! - [`cancel`]: Cancellation reason and kind types

pub mod cancel;
pub mod id;
pub mod outcome;

pub use cancel::{CancelKind, CancelReason};
pub use id::PromiseId;
pub use outcome::Outcome;
