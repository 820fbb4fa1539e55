//! Bridges between promise chains and native async/await.
//!
//! - [`Awaitable`]: await a promise (`promise.await` or
//!   [`Promise::awaitable_result`]). Dropping the future cancels the chain.
//! - [`Promise::from_future`]: run a future as a promise producer.
//!   Cancelling the promise drops the future.
//!
//! [`Promise::awaitable_result`]: crate::promise::Promise::awaitable_result
//! [`Promise::from_future`]: crate::promise::Promise::from_future

mod awaitable;
mod native;

pub use awaitable::Awaitable;
