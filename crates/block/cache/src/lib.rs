//! Read-through block cache.
//!
//! [`BlockCache`] serves reads from a local [`Blockstore`] and, on a miss,
//! fetches the block from an upstream [`BlockSource`]. Every fetched block is
//! verified against the requested CID before it is returned or cached, so a
//! misbehaving upstream cannot poison the local store.
//!
//! [`Blockstore`]: cairn_blockstore_api::Blockstore
//! [`BlockSource`]: cairn_blockstore_api::BlockSource

mod cache;
mod metrics;

pub use cache::{BlockCache, Filled, Population};
