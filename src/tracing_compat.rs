//! Optional structured logging.
//!
//! With the `tracing-integration` feature the `tracing` macros are
//! re-exported; without it the same macro names expand to nothing, so call
//! sites never need their own `cfg` gates.
//!
//! ```rust,ignore
//! use tether::tracing_compat::{debug, trace};
//!
//! trace!(promise_id = %id, "promise settled");
//! debug!(consumers = n, "run-once multicast");
//! ```
//!
//! ```toml
//! tether = { version = "0.1", features = ["tracing-integration"] }
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, error, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    /// Discards a trace-level event.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {{}};
    }

    /// Discards a debug-level event.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {{}};
    }

    /// Discards a warn-level event.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {{}};
    }

    /// Discards an error-level event.
    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {{}};
    }

    pub use crate::{debug, error, trace, warn};
}

#[cfg(not(feature = "tracing-integration"))]
pub use noop::*;
