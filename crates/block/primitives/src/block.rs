//! Immutable content-addressed blocks.

use bytes::Bytes;
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};

use crate::{BlockKey, DAG_PB, IdentifierError};

/// A CID paired with its immutable payload.
///
/// Construction through [`Block::new`], [`Block::new_v1`] or [`Block::with_cid`]
/// guarantees the payload hashes to the CID. [`Block::new_unchecked`] trusts
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    cid: Cid,
    data: Bytes,
}

impl Block {
    /// Create a block addressed by a sha2-256 CIDv0.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let hash = Code::Sha2_256.digest(&data);
        // sha2-256 always satisfies the CIDv0 constraints; fall back to the
        // equivalent CIDv1 rather than panic.
        let cid = Cid::new_v0(hash).unwrap_or_else(|_| Cid::new_v1(DAG_PB, hash));
        Self { cid, data }
    }

    /// Create a block addressed by a CIDv1 with the given codec and hash.
    pub fn new_v1(codec: u64, hash: Code, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let cid = Cid::new_v1(codec, hash.digest(&data));
        Self { cid, data }
    }

    /// Pair a payload with a CID, verifying the digest.
    pub fn with_cid(cid: Cid, data: impl Into<Bytes>) -> Result<Self, IdentifierError> {
        let data = data.into();
        if !crate::verify(&cid, &data)? {
            return Err(IdentifierError::DigestMismatch(cid));
        }
        Ok(Self { cid, data })
    }

    /// Pair a payload with a CID without hashing it.
    pub fn new_unchecked(cid: Cid, data: impl Into<Bytes>) -> Self {
        Self {
            cid,
            data: data.into(),
        }
    }

    /// The block's CID.
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// The block's payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the block, returning its payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Storage key of this block, `None` for the undefined CID.
    pub fn key(&self) -> Option<BlockKey> {
        BlockKey::from_cid(&self.cid)
    }

    /// Check the payload against the CID.
    pub fn verify(&self) -> Result<bool, IdentifierError> {
        crate::verify(&self.cid, &self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RAW, Version};

    #[test]
    fn test_new_is_cidv0() {
        let block = Block::new(&b"some data"[..]);
        assert_eq!(block.cid().version(), Version::V0);
        assert_eq!(block.cid().codec(), DAG_PB);
        assert_eq!(block.cid().hash().code(), u64::from(Code::Sha2_256));
        assert_eq!(block.len(), 9);
        assert!(block.verify().unwrap());
    }

    #[test]
    fn test_new_v1() {
        let block = Block::new_v1(RAW, Code::Blake3_256, b"raw".to_vec());
        assert_eq!(block.cid().version(), Version::V1);
        assert_eq!(block.cid().codec(), RAW);
        assert!(block.verify().unwrap());
    }

    #[test]
    fn test_with_cid_rejects_mismatch() {
        let a = Block::new(&b"a"[..]);
        let err = Block::with_cid(*a.cid(), &b"b"[..]).unwrap_err();
        assert!(matches!(err, IdentifierError::DigestMismatch(cid) if cid == *a.cid()));

        let ok = Block::with_cid(*a.cid(), &b"a"[..]).unwrap();
        assert_eq!(ok, a);
    }

    #[test]
    fn test_empty_block() {
        let block = Block::new(Bytes::new());
        assert!(block.is_empty());
        assert!(block.key().is_some());
    }
}
