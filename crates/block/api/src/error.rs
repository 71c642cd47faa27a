//! Error sentinels for block store operations.
//!
//! Callers distinguish outcomes by variant: a lookup miss is
//! [`BlockstoreError::NotFound`], an integrity failure is
//! [`BlockstoreError::WrongHash`], and so on. Engine failures are carried
//! opaquely in [`BlockstoreError::Engine`].

use cairn_primitives::{Cid, IdentifierError};

/// Boxed engine error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Size reported for a block that is not present.
pub const MISSING_BLOCK_SIZE: i64 = -1;

/// Error type for block store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlockstoreError {
    /// No block stored under this CID.
    #[error("block not found: {0}")]
    NotFound(Cid),

    /// Empty payloads cannot be stored.
    #[error("block data missing")]
    DataMissing,

    /// Payload does not hash to the requested CID.
    #[error("block data does not hash to {0}")]
    WrongHash(Cid),

    /// The operation is not offered by this store.
    #[error("{operation} not supported")]
    Unsupported {
        /// Name of the refused operation.
        operation: &'static str,
    },

    /// The store has been closed.
    #[error("block store is closed")]
    Closed,

    /// The undefined CID cannot be written.
    #[error("cannot store a block under the undefined cid")]
    UndefinedCid,

    /// Payload exceeds the configured maximum record size.
    #[error("block of {size} bytes exceeds maximum value size {max}")]
    ValueTooLarge {
        /// Payload length.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Identifier could not be decoded or hashed.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// Failure inside the persistent engine.
    #[error("engine error: {0}")]
    Engine(#[source] BoxError),
}

impl BlockstoreError {
    /// Wrap an engine failure.
    pub fn engine(err: impl Into<BoxError>) -> Self {
        Self::Engine(err.into())
    }

    /// Refuse an operation.
    pub const fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Returns true for a lookup miss.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for block store operations.
pub type BlockstoreResult<T> = Result<T, BlockstoreError>;

/// Flatten a `get_size` result into a signed size.
///
/// A missing block becomes [`MISSING_BLOCK_SIZE`]; every other error is
/// returned unchanged.
pub fn size_or_sentinel(result: BlockstoreResult<usize>) -> BlockstoreResult<i64> {
    match result {
        Ok(size) => Ok(i64::try_from(size).unwrap_or(i64::MAX)),
        Err(BlockstoreError::NotFound(_)) => Ok(MISSING_BLOCK_SIZE),
        Err(err) => Err(err),
    }
}
