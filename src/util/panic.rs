//! Panic capture for user callbacks.
//!
//! Producers, transforms and handlers are user code; a panic inside one of
//! them must settle the node as a failure instead of unwinding through an
//! executor thread.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::Error;
use crate::tracing_compat::error;

/// Runs `f`, converting a panic into an [`ErrorKind::Panicked`] error.
///
/// [`ErrorKind::Panicked`]: crate::error::ErrorKind::Panicked
pub(crate) fn catch_panic<R>(f: impl FnOnce() -> R) -> Result<R, Error> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        error!(panic = %message, "captured panic in promise callback");
        Error::panicked(message)
    })
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
