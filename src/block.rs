//! Block Module
//!
//! The block records this crate persists, and the content hash they are
//! stored under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{BlockStoreError, Result};

/// Length of a block hash in bytes
pub const HASH_LEN: usize = 32;

/// A 32-byte hash (block identity, state root, parent link)
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; HASH_LEN]);

    /// Build a hash from a raw slice; fails unless it is exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; HASH_LEN] = bytes.try_into().map_err(|_| {
            BlockStoreError::InvalidHash(format!(
                "expected {} bytes, got {}",
                HASH_LEN,
                bytes.len()
            ))
        })?;
        Ok(Hash(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Hash {
    type Err = BlockStoreError;

    /// Parse hex, with or without a `0x` prefix
    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| BlockStoreError::InvalidHash(format!("{:?}: {}", s, e)))?;
        Hash::from_slice(&bytes)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl From<[u8; HASH_LEN]> for Hash {
    fn from(raw: [u8; HASH_LEN]) -> Self {
        Hash(raw)
    }
}

/// Block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Position in the chain; assigned by the producer
    pub height: u64,

    /// Header hash of the previous block
    pub parent_hash: Hash,

    /// State commitment after applying this block
    pub state_root: Hash,

    /// Unix millis
    pub timestamp: u64,
}

/// An immutable block record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,

    /// Identity the producer assigned to the header
    pub header_hash: Hash,

    /// Opaque transaction payloads
    pub transactions: Vec<Vec<u8>>,
}

impl Block {
    pub fn new(header: Header, header_hash: Hash, transactions: Vec<Vec<u8>>) -> Self {
        Self {
            header,
            header_hash,
            transactions,
        }
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    /// Content hash: the key this block is stored under.
    ///
    /// SHA-256 over every field in declaration order. Integers are
    /// big-endian; transactions are length-prefixed so that different
    /// splits of the same bytes hash differently.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.header.height.to_be_bytes());
        hasher.update(self.header.parent_hash.0);
        hasher.update(self.header.state_root.0);
        hasher.update(self.header.timestamp.to_be_bytes());
        hasher.update(self.header_hash.0);
        hasher.update((self.transactions.len() as u64).to_be_bytes());
        for tx in &self.transactions {
            hasher.update((tx.len() as u64).to_be_bytes());
            hasher.update(tx);
        }
        Hash(hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block {
        Block::new(
            Header {
                height: 7,
                parent_hash: Hash([1u8; 32]),
                state_root: Hash([2u8; 32]),
                timestamp: 1_700_000_000_000,
            },
            Hash([3u8; 32]),
            vec![b"tx-a".to_vec(), b"tx-b".to_vec()],
        )
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sample_block().hash(), sample_block().hash());
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = sample_block();
        let mut b = sample_block();
        b.header.height += 1;
        assert_ne!(a.hash(), b.hash());

        let mut c = sample_block();
        c.transactions = vec![b"tx-atx-b".to_vec()];
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let hash = sample_block().hash();
        let text = hash.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 2 + 64);
        assert_eq!(text.parse::<Hash>().unwrap(), hash);
        assert_eq!(text[2..].parse::<Hash>().unwrap(), hash);
    }

    #[test]
    fn test_hash_rejects_wrong_length() {
        assert!("0xabcd".parse::<Hash>().is_err());
        assert!(Hash::from_slice(&[0u8; 31]).is_err());
        assert!(Hash::from_slice(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_hash_rejects_non_hex() {
        let err = "0xzz".parse::<Hash>().unwrap_err();
        assert!(matches!(err, BlockStoreError::InvalidHash(_)));
    }
}
