//! Canonical storage keys.
//!
//! A [`BlockKey`] is the multihash of a CID in its binary form:
//! `varint(hash code) || varint(digest length) || digest`. Version and codec
//! are discarded, so every CID wrapping the same multihash maps to one key.
//! This matches the multihash-keyed layout of go-ipfs blockstores.

use core::fmt;

use cid::Cid;

use crate::{IdentifierError, Multihash, RAW};

/// Canonical storage key derived from a CID's multihash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey(Vec<u8>);

impl BlockKey {
    /// Derive the key for a CID. Returns `None` for the undefined CID.
    pub fn from_cid(cid: &Cid) -> Option<Self> {
        if crate::is_undefined(cid) {
            return None;
        }
        Some(Self(cid.hash().to_bytes()))
    }

    /// Rebuild a key from stored bytes, validating the multihash framing.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IdentifierError> {
        Multihash::from_bytes(bytes)?;
        Ok(Self(bytes.to_vec()))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode the multihash the key was derived from.
    pub fn multihash(&self) -> Result<Multihash, IdentifierError> {
        Ok(Multihash::from_bytes(&self.0)?)
    }

    /// Reconstruct the canonical CID for this key: CIDv1, raw codec.
    pub fn to_cid(&self) -> Result<Cid, IdentifierError> {
        Ok(Cid::new_v1(RAW, self.multihash()?))
    }
}

impl AsRef<[u8]> for BlockKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}
