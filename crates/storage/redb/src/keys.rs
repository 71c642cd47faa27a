//! Cancellable key enumeration.

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use cairn_blockstore_api::{BlockstoreError, BlockstoreResult};
use cairn_primitives::{BlockKey, Cid};
use futures::Stream;
use redb::{Database, ReadableTable};
use tokio::{runtime::Handle, sync::mpsc};
use tokio_util::{
    sync::{CancellationToken, DropGuard},
    task::TaskTracker,
};
use tracing::{trace, warn};

use crate::store::BLOCKS_TABLE;

/// Capacity of the producer channel. Keeps at most one key in flight.
const KEYS_CHANNEL_CAPACITY: usize = 1;

/// Stream of every CID in a [`RedbBlockstore`](crate::RedbBlockstore).
///
/// Keys come from a single read transaction, so the stream yields exactly the
/// keys present when enumeration started, each as a CIDv1 with the raw codec.
/// Order is unspecified.
///
/// Once the caller's token fires, or the store is closed, the stream yields
/// nothing further and ends. Dropping the stream stops the producer.
#[derive(Debug)]
pub struct AllKeys {
    rx: mpsc::Receiver<Cid>,
    cancel: CancellationToken,
    shutdown: CancellationToken,
    _guard: DropGuard,
}

impl AllKeys {
    /// Start a producer on the blocking pool, tracked by `tasks`.
    ///
    /// `shutdown` is the store's close token.
    pub(crate) fn spawn(
        db: Arc<Database>,
        cancel: &CancellationToken,
        shutdown: &CancellationToken,
        tasks: &TaskTracker,
    ) -> BlockstoreResult<Self> {
        let handle = Handle::try_current().map_err(BlockstoreError::engine)?;
        let token = cancel.child_token();
        let (tx, rx) = mpsc::channel(KEYS_CHANNEL_CAPACITY);

        let stop = Stop {
            cancel: token.clone(),
            shutdown: shutdown.clone(),
        };
        tasks.spawn_blocking_on(
            {
                let handle = handle.clone();
                move || match produce(&db, &tx, &stop, &handle) {
                    Ok(sent) => trace!(sent, "Key enumeration finished"),
                    Err(err) => warn!(%err, "Key enumeration aborted"),
                }
            },
            &handle,
        );

        Ok(Self {
            rx,
            _guard: token.clone().drop_guard(),
            cancel: token,
            shutdown: shutdown.clone(),
        })
    }
}

/// The two ways a producer is told to stop.
struct Stop {
    cancel: CancellationToken,
    shutdown: CancellationToken,
}

impl Stop {
    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.shutdown.is_cancelled()
    }
}

impl Stream for AllKeys {
    type Item = Cid;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Cid>> {
        if self.cancel.is_cancelled() || self.shutdown.is_cancelled() {
            self.rx.close();
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

/// Walk the blocks table, sending each key until done or cancelled.
///
/// Cancellation is checked before every engine read, and every send races
/// against it so a stalled consumer cannot pin the producer (or the database
/// handle it holds) past close.
fn produce(
    db: &Database,
    tx: &mpsc::Sender<Cid>,
    stop: &Stop,
    handle: &Handle,
) -> Result<usize, redb::Error> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(BLOCKS_TABLE)?;
    let mut entries = table.iter()?;
    let mut sent = 0;

    loop {
        if stop.is_stopped() {
            trace!(sent, "Key enumeration cancelled");
            break;
        }

        let Some(entry) = entries.next() else {
            break;
        };
        let (key, _) = entry?;

        let cid = match BlockKey::from_bytes(key.value()).and_then(|key| key.to_cid()) {
            Ok(cid) => cid,
            Err(err) => {
                warn!(%err, "Skipping undecodable block key");
                continue;
            }
        };

        let delivered = handle.block_on(async {
            tokio::select! {
                biased;

                _ = stop.cancel.cancelled() => false,
                _ = stop.shutdown.cancelled() => false,
                res = tx.send(cid) => res.is_ok(),
            }
        });
        if !delivered {
            break;
        }
        sent += 1;
    }

    Ok(sent)
}
