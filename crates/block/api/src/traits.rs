//! Block store capability traits.

use async_trait::async_trait;
use cairn_primitives::{Block, Cid};
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::BlockstoreResult;

/// Stream of stored CIDs produced by [`Blockstore::all_keys`].
pub type KeyStream = BoxStream<'static, Cid>;

/// Read-only block access.
///
/// This is all a read-through cache needs from its upstream.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Check whether a block is present. A miss is `Ok(false)`.
    async fn has(&self, cid: &Cid) -> BlockstoreResult<bool>;

    /// Fetch a block. A miss is [`BlockstoreError::NotFound`](crate::BlockstoreError::NotFound).
    async fn get(&self, cid: &Cid) -> BlockstoreResult<Block>;

    /// Payload length of a block without returning the payload.
    async fn get_size(&self, cid: &Cid) -> BlockstoreResult<usize>;
}

/// Full block store capability set.
#[async_trait]
pub trait Blockstore: BlockSource {
    /// Store a block. Storing a block that is already present is a no-op.
    async fn put(&self, block: Block) -> BlockstoreResult<()>;

    /// Store several blocks.
    async fn put_many(&self, blocks: Vec<Block>) -> BlockstoreResult<()>;

    /// Remove a block.
    async fn delete_block(&self, cid: &Cid) -> BlockstoreResult<()>;

    /// Enumerate every stored CID until the stream ends or `cancel` fires.
    async fn all_keys(&self, cancel: CancellationToken) -> BlockstoreResult<KeyStream>;

    /// Toggle payload verification on read.
    fn hash_on_read(&self, enabled: bool);
}
