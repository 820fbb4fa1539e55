//! Three-valued settlement of a promise node.
//!
//! - `Ok(T)`: the node settled with a value
//! - `Err(Error)`: the node settled with a failure
//! - `Cancelled(CancelReason)`: the node was cancelled and delivers nothing
//!
//! These form a severity lattice: `Ok < Err < Cancelled`. Continuations see
//! the full outcome so that cleanup runs on every exit path; consumers that
//! only care about values see a `Result`.

use super::cancel::CancelReason;
use crate::error::Error;

/// The terminal state of a promise node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Success with a value.
    Ok(T),
    /// The producer or a transform failed.
    Err(Error),
    /// The node was cancelled before delivering.
    Cancelled(CancelReason),
}

impl<T> Outcome<T> {
    /// Returns the severity level of this outcome (0 = Ok, 2 = Cancelled).
    #[must_use]
    pub const fn severity(&self) -> u8 {
        match self {
            Self::Ok(_) => 0,
            Self::Err(_) => 1,
            Self::Cancelled(_) => 2,
        }
    }

    /// Returns a short lowercase name for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ok(_) => "ok",
            Self::Err(_) => "err",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// Returns true if this outcome is `Ok`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns true if this outcome is `Err`.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// Returns true if this outcome is `Cancelled`.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns the success value, if any.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the failure, if any.
    #[must_use]
    pub fn err(&self) -> Option<&Error> {
        match self {
            Self::Err(e) => Some(e),
            _ => None,
        }
    }

    /// Converts this outcome to a `Result`, reporting cancellation as an
    /// [`ErrorKind::Cancelled`](crate::error::ErrorKind::Cancelled) failure.
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(e),
            Self::Cancelled(r) => Err(Error::cancelled(&r)),
        }
    }

    /// Maps the success value using the provided function.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Err(e) => Outcome::Err(e),
            Self::Cancelled(r) => Outcome::Cancelled(r),
        }
    }

    /// Borrows the success value.
    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Self::Ok(v) => Outcome::Ok(v),
            Self::Err(e) => Outcome::Err(e.clone()),
            Self::Cancelled(r) => Outcome::Cancelled(r.clone()),
        }
    }
}

impl<T> From<Result<T, Error>> for Outcome<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Err(e),
        }
    }
}
