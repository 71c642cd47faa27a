//! redb-based block store.
//!
//! This module provides [`RedbBlockstore`], a persistent, append-only block
//! store backed by the redb embedded database.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use cairn_blockstore_api::{BlockSource, Blockstore, BlockstoreError, BlockstoreResult, KeyStream};
use cairn_primitives::{Block, BlockKey, Cid};
use futures::StreamExt;
use parking_lot::RwLock;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, trace, warn};

use crate::{AllKeys, StoreOptions};

/// Extension of the engine file created under the store directory.
pub const FILE_EXTENSION: &str = "redb";

/// Table definition for blocks.
/// Key: multihash bytes of the block's CID
/// Value: block payload
pub(crate) const BLOCKS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("blocks");

/// redb-based block store.
///
/// Keys are derived with [`BlockKey::from_cid`], so a block written under a
/// CIDv0 is readable under any CIDv1 wrapping the same multihash.
///
/// Engine calls run on the blocking pool. After [`close`](Self::close) every
/// operation fails with [`BlockstoreError::Closed`] and open key streams end;
/// reads and writes already running complete normally. The engine file is
/// released once they finish, see [`closed`](Self::closed).
#[derive(Debug)]
pub struct RedbBlockstore {
    db: RwLock<Option<Arc<Database>>>,
    /// Cancelled on close; stops key enumeration.
    shutdown: CancellationToken,
    /// Every blocking task holding a database handle.
    tasks: TaskTracker,
    path: PathBuf,
    max_value_size: Option<usize>,
    hash_on_read: AtomicBool,
}

impl RedbBlockstore {
    /// Open or create the store `directory/basename.redb`.
    ///
    /// Fails with an engine error if the file is corrupt or already open.
    pub fn open(
        directory: impl AsRef<Path>,
        basename: &str,
        options: &StoreOptions,
    ) -> BlockstoreResult<Self> {
        let directory = directory.as_ref();
        if options.create_dir {
            std::fs::create_dir_all(directory).map_err(BlockstoreError::engine)?;
        }
        let path = directory.join(format!("{basename}.{FILE_EXTENSION}"));

        let mut builder = Database::builder();
        if let Some(bytes) = options.cache_size_bytes {
            builder.set_cache_size(bytes);
        }
        let db = builder.create(&path).map_err(engine)?;

        // Ensure the blocks table exists
        let write_txn = db.begin_write().map_err(engine)?;
        {
            let _ = write_txn.open_table(BLOCKS_TABLE).map_err(engine)?;
        }
        write_txn.commit().map_err(engine)?;

        debug!(path = %path.display(), "Opened redb block store");
        Ok(Self {
            db: RwLock::new(Some(Arc::new(db))),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
            path,
            max_value_size: options.max_value_size,
            hash_on_read: AtomicBool::new(options.hash_on_read),
        })
    }

    /// Path of the engine file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.db.read().is_none()
    }

    /// Release the database. Closing an already closed store is a no-op.
    ///
    /// Open key streams are stopped. Engine calls already running keep the
    /// file open until they finish.
    pub fn close(&self) -> BlockstoreResult<()> {
        let db = self.db.write().take();
        if let Some(db) = db {
            self.shutdown.cancel();
            self.tasks.close();
            let in_flight = Arc::strong_count(&db).saturating_sub(1);
            drop(db);
            debug!(path = %self.path.display(), in_flight, "Closed redb block store");
        }
        Ok(())
    }

    /// Wait until the store is closed and every engine call has released the
    /// database file. Pending until [`close`](Self::close) is called.
    pub async fn closed(&self) {
        self.tasks.wait().await;
    }

    /// Number of stored blocks.
    pub async fn count(&self) -> BlockstoreResult<u64> {
        self.with_database(|db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(BLOCKS_TABLE)?;
            let count = table.len()?;
            Ok(count)
        })
        .await
    }

    /// Enumerate every stored CID. See [`AllKeys`].
    pub fn keys(&self, cancel: &CancellationToken) -> BlockstoreResult<AllKeys> {
        AllKeys::spawn(self.database()?, cancel, &self.shutdown, &self.tasks)
    }

    fn database(&self) -> BlockstoreResult<Arc<Database>> {
        self.db.read().as_ref().map(Arc::clone).ok_or(BlockstoreError::Closed)
    }

    /// Run `f` against the database on the blocking pool.
    async fn with_database<T, F>(&self, f: F) -> BlockstoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, redb::Error> + Send + 'static,
    {
        let db = self.database()?;
        self.tasks
            .spawn_blocking(move || f(&db))
            .await
            .map_err(BlockstoreError::engine)?
            .map_err(BlockstoreError::engine)
    }

    /// Validate a block for writing and split it into key and payload.
    fn record(&self, block: Block) -> BlockstoreResult<(BlockKey, Bytes)> {
        let key = block.key().ok_or(BlockstoreError::UndefinedCid)?;
        if block.is_empty() {
            return Err(BlockstoreError::DataMissing);
        }
        if let Some(max) = self.max_value_size
            && block.len() > max
        {
            return Err(BlockstoreError::ValueTooLarge {
                size: block.len(),
                max,
            });
        }
        Ok((key, block.into_data()))
    }
}

fn engine(err: impl Into<redb::Error>) -> BlockstoreError {
    BlockstoreError::engine(err.into())
}

/// Insert every record whose key is absent, in one transaction.
///
/// Existing records are never overwritten. Returns the number inserted.
fn insert_absent(db: &Database, records: &[(BlockKey, Bytes)]) -> Result<usize, redb::Error> {
    let write_txn = db.begin_write()?;
    let mut inserted = 0;
    {
        let mut table = write_txn.open_table(BLOCKS_TABLE)?;
        for (key, data) in records {
            if table.get(key.as_bytes())?.is_none() {
                table.insert(key.as_bytes(), data.as_ref())?;
                inserted += 1;
            }
        }
    }
    write_txn.commit()?;
    Ok(inserted)
}

#[async_trait]
impl BlockSource for RedbBlockstore {
    async fn has(&self, cid: &Cid) -> BlockstoreResult<bool> {
        let Some(key) = BlockKey::from_cid(cid) else {
            return Ok(false);
        };
        self.with_database(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(BLOCKS_TABLE)?;
            let found = table.get(key.as_bytes())?.is_some();
            Ok(found)
        })
        .await
    }

    async fn get(&self, cid: &Cid) -> BlockstoreResult<Block> {
        let Some(key) = BlockKey::from_cid(cid) else {
            return Err(BlockstoreError::NotFound(*cid));
        };
        let data = self
            .with_database(move |db| {
                let read_txn = db.begin_read()?;
                let table = read_txn.open_table(BLOCKS_TABLE)?;
                let data = table
                    .get(key.as_bytes())?
                    .map(|value| Bytes::copy_from_slice(value.value()));
                Ok(data)
            })
            .await?
            .ok_or(BlockstoreError::NotFound(*cid))?;

        if self.hash_on_read.load(Ordering::Relaxed) && !cairn_primitives::verify(cid, &data)? {
            warn!(%cid, "Stored block failed verification on read");
            return Err(BlockstoreError::WrongHash(*cid));
        }

        trace!(%cid, size = data.len(), "Read block");
        Ok(Block::new_unchecked(*cid, data))
    }

    async fn get_size(&self, cid: &Cid) -> BlockstoreResult<usize> {
        let Some(key) = BlockKey::from_cid(cid) else {
            return Err(BlockstoreError::NotFound(*cid));
        };
        self.with_database(move |db| {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(BLOCKS_TABLE)?;
            let size = table.get(key.as_bytes())?.map(|value| value.value().len());
            Ok(size)
        })
        .await?
        .ok_or(BlockstoreError::NotFound(*cid))
    }
}

#[async_trait]
impl Blockstore for RedbBlockstore {
    async fn put(&self, block: Block) -> BlockstoreResult<()> {
        let cid = *block.cid();
        let record = self.record(block)?;
        let inserted = self
            .with_database(move |db| insert_absent(db, core::slice::from_ref(&record)))
            .await?;

        if inserted == 0 {
            trace!(%cid, "Block already stored");
        } else {
            trace!(%cid, "Stored block");
        }
        Ok(())
    }

    /// Validates every block before writing any, then commits the batch in a
    /// single transaction: either all new blocks are stored or none are.
    async fn put_many(&self, blocks: Vec<Block>) -> BlockstoreResult<()> {
        if blocks.is_empty() {
            return Ok(());
        }
        let records = blocks
            .into_iter()
            .map(|block| self.record(block))
            .collect::<BlockstoreResult<Vec<_>>>()?;

        let count = records.len();
        let inserted = self.with_database(move |db| insert_absent(db, &records)).await?;
        debug!(count, inserted, "Stored block batch");
        Ok(())
    }

    async fn delete_block(&self, _cid: &Cid) -> BlockstoreResult<()> {
        Err(BlockstoreError::unsupported("delete_block"))
    }

    async fn all_keys(&self, cancel: CancellationToken) -> BlockstoreResult<KeyStream> {
        Ok(self.keys(&cancel)?.boxed())
    }

    fn hash_on_read(&self, enabled: bool) {
        self.hash_on_read.store(enabled, Ordering::Relaxed);
    }
}
