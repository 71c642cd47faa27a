//! Core primitive types for content-addressed block storage.
//!
//! Blocks are addressed by a [`Cid`]. Storage is keyed by the CID's multihash
//! alone (see [`BlockKey`]), so CIDs that differ only in version or codec
//! resolve to the same record.

mod block;
mod error;
mod key;

pub use block::Block;
pub use error::IdentifierError;
pub use key::BlockKey;

pub use cid::{Cid, Version};
pub use multihash_codetable::{Code, MultihashDigest};

/// Multihash with the default 64-byte digest capacity used by [`Cid`].
pub type Multihash = multihash::Multihash<64>;

/// Multicodec for raw binary content.
pub const RAW: u64 = 0x55;

/// Multicodec for MerkleDAG protobuf nodes (the implicit CIDv0 codec).
pub const DAG_PB: u64 = 0x70;

/// Returns the undefined CID: a CIDv1 over an empty multihash.
///
/// It never resolves to a stored block.
pub fn undefined_cid() -> Cid {
    Cid::new_v1(RAW, Multihash::default())
}

/// Returns true if the CID carries no digest.
pub fn is_undefined(cid: &Cid) -> bool {
    cid.hash().size() == 0
}

/// Parses a CID from its string form (base58 CIDv0 or multibase CIDv1).
pub fn parse_cid(s: &str) -> Result<Cid, IdentifierError> {
    Ok(Cid::try_from(s.trim())?)
}

/// Hashes `data` with the multihash function identified by `code`.
pub fn digest(code: u64, data: &[u8]) -> Result<Multihash, IdentifierError> {
    let code = Code::try_from(code).map_err(|_| IdentifierError::UnsupportedHash(code))?;
    Ok(code.digest(data))
}

/// Recomputes the digest of `data` with the CID's hash function and compares
/// it with the CID's digest.
///
/// Truncated multihashes compare against the same-length prefix of the full
/// digest. The undefined CID never verifies.
pub fn verify(cid: &Cid, data: &[u8]) -> Result<bool, IdentifierError> {
    let expected = cid.hash();
    if expected.size() == 0 {
        return Ok(false);
    }

    let computed = digest(expected.code(), data)?;
    let len = usize::from(expected.size());
    Ok(computed.digest().get(..len) == Some(expected.digest()))
}
