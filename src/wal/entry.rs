//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{BlockStoreError, Result};

/// Frame header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

/// Outcome of decoding one frame from the front of a buffer
#[derive(Debug)]
pub(crate) enum Frame {
    /// A valid entry and the number of bytes it occupied
    Entry(WalEntry, usize),

    /// A complete frame whose checksum or payload is bad
    Corrupt(String),

    /// Not enough bytes for a whole frame (torn write at the tail)
    Incomplete,
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Serialize into a complete frame
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&(&self.operation, self.timestamp))?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            BlockStoreError::Serialization(format!("WAL payload too large: {} bytes", payload.len()))
        })?;

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        buf.put_u64_le(self.lsn);
        buf.put_u32_le(Self::compute_crc(self.lsn, &payload));
        buf.put_u32_le(len);
        buf.put_slice(&payload);

        Ok(buf.to_vec())
    }

    /// Deserialize one frame from the start of `bytes`
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        match Self::decode_frame(bytes) {
            Frame::Entry(entry, _) => Ok(entry),
            Frame::Corrupt(reason) => Err(BlockStoreError::WalCorruption(reason)),
            Frame::Incomplete => Err(BlockStoreError::WalCorruption(format!(
                "incomplete entry: {} bytes available",
                bytes.len()
            ))),
        }
    }

    /// CRC32 over LSN, payload length and payload
    pub fn compute_crc(lsn: u64, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(&(payload.len() as u32).to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }

    pub(crate) fn decode_frame(bytes: &[u8]) -> Frame {
        if bytes.len() < HEADER_SIZE {
            return Frame::Incomplete;
        }

        let mut header = &bytes[..HEADER_SIZE];
        let lsn = header.get_u64_le();
        let stored_crc = header.get_u32_le();
        let len = header.get_u32_le() as usize;

        let Some(payload) = bytes.get(HEADER_SIZE..HEADER_SIZE + len) else {
            return Frame::Incomplete;
        };

        let actual_crc = Self::compute_crc(lsn, payload);
        if actual_crc != stored_crc {
            return Frame::Corrupt(format!(
                "CRC mismatch for lsn {}: stored {:#010x}, computed {:#010x}",
                lsn, stored_crc, actual_crc
            ));
        }

        match bincode::deserialize::<(Operation, u64)>(payload) {
            Ok((operation, timestamp)) => Frame::Entry(
                WalEntry {
                    lsn,
                    operation,
                    timestamp,
                },
                HEADER_SIZE + len,
            ),
            Err(e) => Frame::Corrupt(format!("undecodable payload for lsn {}: {}", lsn, e)),
        }
    }
}
