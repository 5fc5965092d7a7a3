//! Block codec
//!
//! Encoding of block records and index keys.
//!
//! ## Key Layout
//! ```text
//! ┌──────────────────────────┬──────────────────────────────┐
//! │ Key                      │ Value                        │
//! ├──────────────────────────┼──────────────────────────────┤
//! │ block hash (32)          │ encoded block (bincode)      │
//! │ height, big-endian (8)   │ block hash (32)              │
//! │ "LatestBlock" (11)       │ block hash of the head (32)  │
//! └──────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Heights are fixed-width big-endian so byte order of keys matches numeric
//! order of heights.

use crate::block::Block;
use crate::error::{BlockStoreError, Result};

/// Reserved key holding the hash of the current head
pub const HEAD_KEY: &[u8] = b"LatestBlock";

/// Width of an encoded height key
pub const HEIGHT_KEY_LEN: usize = 8;

/// Encode a block to bytes
pub fn encode_block(block: &Block) -> Result<Vec<u8>> {
    bincode::serialize(block).map_err(|e| BlockStoreError::Encoding(e.to_string()))
}

/// Decode a block from bytes
///
/// Rejects trailing bytes so a truncated-then-appended record is not
/// mistaken for a valid one.
pub fn decode_block(bytes: &[u8]) -> Result<Block> {
    use bincode::Options;

    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(bytes)
        .map_err(|e| BlockStoreError::Decoding(e.to_string()))
}

/// Encode a block height as an 8-byte big-endian key
pub fn encode_height(height: u64) -> [u8; HEIGHT_KEY_LEN] {
    height.to_be_bytes()
}

/// Decode a height key; `None` unless exactly 8 bytes
pub fn decode_height(bytes: &[u8]) -> Option<u64> {
    let raw: [u8; HEIGHT_KEY_LEN] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(raw))
}
