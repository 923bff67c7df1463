//! Collection types used throughout the tile graphs.
//!
//! Fast hashing (`rustc-hash`), inline buffers (`smallvec`) and the slot map storage
//! backend (`slotmap`) are gathered here so the rest of the crate never names the
//! concrete implementations.

mod aliases;
mod helpers;

pub use aliases::*;
pub use helpers::*;
