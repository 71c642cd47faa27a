//! Block store API - capability traits for content-addressed storage.
//!
//! - [`BlockSource`] - read-only access: `has`, `get`, `get_size`
//! - [`Blockstore`] - full access: adds writes, deletion and key enumeration
//!
//! Persistent stores implement [`Blockstore`]. A read-through cache is itself a
//! [`Blockstore`] that composes over a local [`Blockstore`] and an upstream
//! [`BlockSource`].

#![warn(missing_docs)]

mod error;
mod traits;

pub use error::*;
pub use traits::*;

pub use cairn_primitives::{Block, Cid};
