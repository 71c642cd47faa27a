//! Identifier error types.

use cid::Cid;

/// Errors from decoding identifiers or hashing block payloads.
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// The multihash code has no hasher in the code table.
    #[error("unsupported hash function: {0:#x}")]
    UnsupportedHash(u64),

    /// Malformed multihash bytes.
    #[error("invalid multihash: {0}")]
    Multihash(#[from] multihash::Error),

    /// Malformed CID.
    #[error("invalid cid: {0}")]
    Cid(#[from] cid::Error),

    /// Payload does not hash to the CID it was paired with.
    #[error("payload does not match {0}")]
    DigestMismatch(Cid),
}
