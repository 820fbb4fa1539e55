//! Internal utilities.

pub(crate) mod arena;
pub(crate) mod panic;

pub(crate) use arena::{Arena, ArenaIndex};
