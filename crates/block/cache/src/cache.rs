//! Verified read-through cache over a local block store.

use std::sync::Arc;

use async_trait::async_trait;
use cairn_blockstore_api::{BlockSource, Blockstore, BlockstoreError, BlockstoreResult, KeyStream};
use cairn_primitives::{Block, Cid};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::metrics::CacheMetrics;

/// What happened to a verified block when the cache tried to keep it.
///
/// Keeping a filled block is best-effort: a local write failure never fails
/// the read that triggered the fill.
#[derive(Debug)]
pub enum Population {
    /// The block was written to the local store (or was already there).
    Stored,
    /// The local store refused the block; the read still succeeds.
    Skipped(BlockstoreError),
}

/// A block fetched from upstream and verified against its CID.
#[derive(Debug)]
pub struct Filled {
    /// The verified block, addressed by the CID that was requested.
    pub block: Block,
    /// Outcome of caching the block locally.
    pub population: Population,
}

/// Read-through cache: a local [`Blockstore`] filled on demand from an
/// optional upstream [`BlockSource`].
///
/// The cache view is read-only. Writes, deletes and enumeration are refused
/// with [`BlockstoreError::Unsupported`]: the local store only ever receives
/// blocks that passed digest verification, since an append-only store cannot
/// take back a bad record.
///
/// The upstream is shared, never closed by the cache.
pub struct BlockCache<S, U: ?Sized = dyn BlockSource> {
    store: S,
    upstream: Option<Arc<U>>,
    metrics: CacheMetrics,
}

impl<S, U> BlockCache<S, U>
where
    S: Blockstore,
    U: BlockSource + ?Sized,
{
    /// Create a cache over `store`, filling misses from `upstream` if given.
    pub fn new(store: S, upstream: Option<Arc<U>>) -> Self {
        Self {
            store,
            upstream,
            metrics: CacheMetrics::default(),
        }
    }

    /// The local store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The upstream source, if any.
    pub fn upstream(&self) -> Option<&Arc<U>> {
        self.upstream.as_ref()
    }

    /// Consume the cache, returning the local store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Fetch `cid` from upstream, verify it and try to keep it locally.
    ///
    /// Fails with [`BlockstoreError::NotFound`] when no upstream is
    /// configured, with the upstream's error unchanged when the fetch fails,
    /// and with [`BlockstoreError::WrongHash`] when the payload does not hash to
    /// `cid`. A rejected block never reaches the local store.
    pub async fn fill_from_upstream(&self, cid: &Cid) -> BlockstoreResult<Filled> {
        let Some(upstream) = &self.upstream else {
            return Err(BlockstoreError::NotFound(*cid));
        };

        let fetched = upstream.get(cid).await?;
        if !cairn_primitives::verify(cid, fetched.data())? {
            self.metrics.wrong_hash.increment(1);
            warn!(%cid, upstream_cid = %fetched.cid(), "Upstream block failed verification");
            return Err(BlockstoreError::WrongHash(*cid));
        }
        self.metrics.fills.increment(1);

        let block = Block::new_unchecked(*cid, fetched.into_data());
        let population = match self.store.put(block.clone()).await {
            Ok(()) => {
                trace!(%cid, size = block.len(), "Cached block from upstream");
                Population::Stored
            }
            Err(err) => {
                self.metrics.population_failures.increment(1);
                warn!(%cid, %err, "Failed to cache verified block");
                Population::Skipped(err)
            }
        };

        Ok(Filled { block, population })
    }
}

#[async_trait]
impl<S, U> BlockSource for BlockCache<S, U>
where
    S: Blockstore,
    U: BlockSource + ?Sized,
{
    async fn has(&self, cid: &Cid) -> BlockstoreResult<bool> {
        if self.store.has(cid).await? {
            self.metrics.hits.increment(1);
            return Ok(true);
        }
        self.metrics.misses.increment(1);

        match self.fill_from_upstream(cid).await {
            Ok(_) => Ok(true),
            Err(BlockstoreError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn get(&self, cid: &Cid) -> BlockstoreResult<Block> {
        match self.store.get(cid).await {
            Err(BlockstoreError::NotFound(_)) => {
                self.metrics.misses.increment(1);
                debug!(%cid, "Cache miss, filling from upstream");
                Ok(self.fill_from_upstream(cid).await?.block)
            }
            local => {
                if local.is_ok() {
                    self.metrics.hits.increment(1);
                }
                local
            }
        }
    }

    async fn get_size(&self, cid: &Cid) -> BlockstoreResult<usize> {
        match self.store.get_size(cid).await {
            Err(BlockstoreError::NotFound(_)) => {
                self.metrics.misses.increment(1);
                Ok(self.fill_from_upstream(cid).await?.block.len())
            }
            local => {
                if local.is_ok() {
                    self.metrics.hits.increment(1);
                }
                local
            }
        }
    }
}

#[async_trait]
impl<S, U> Blockstore for BlockCache<S, U>
where
    S: Blockstore,
    U: BlockSource + ?Sized,
{
    async fn put(&self, _block: Block) -> BlockstoreResult<()> {
        Err(BlockstoreError::unsupported("put on cache"))
    }

    async fn put_many(&self, _blocks: Vec<Block>) -> BlockstoreResult<()> {
        Err(BlockstoreError::unsupported("put_many on cache"))
    }

    async fn delete_block(&self, _cid: &Cid) -> BlockstoreResult<()> {
        Err(BlockstoreError::unsupported("delete_block on cache"))
    }

    async fn all_keys(&self, _cancel: CancellationToken) -> BlockstoreResult<KeyStream> {
        Err(BlockstoreError::unsupported("all_keys on cache"))
    }

    /// Verification on fill is unconditional; this toggle has no effect.
    fn hash_on_read(&self, _enabled: bool) {}
}
