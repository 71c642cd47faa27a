//! redb-backed content-addressed block store.
//!
//! [`RedbBlockstore`] persists blocks in a single redb table keyed by the
//! multihash of each block's CID. The table is append-only: a record is
//! inserted only when its key is absent and is never removed.
//!
//! Enumeration ([`RedbBlockstore::keys`]) runs on the blocking pool and feeds
//! an [`AllKeys`] stream that stops as soon as its cancellation token fires.

mod keys;
mod options;
mod store;

pub use keys::AllKeys;
pub use options::{StoreArgs, StoreOptions};
pub use store::{FILE_EXTENSION, RedbBlockstore};
