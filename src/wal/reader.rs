//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs;
use std::path::Path;

use crate::error::{BlockStoreError, Result};

use super::entry::Frame;
use super::WalEntry;

/// Reads entries from the WAL file
///
/// The log is truncated on every flush, so it is read into memory whole.
pub struct WalReader {
    data: Vec<u8>,
    position: usize,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            data: fs::read(path)?,
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file and an error for a corrupt
    /// or torn entry.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.next_frame() {
            None => Ok(None),
            Some(Frame::Entry(entry, _)) => Ok(Some(entry)),
            Some(Frame::Corrupt(reason)) => Err(BlockStoreError::WalCorruption(format!(
                "at offset {}: {}",
                self.position, reason
            ))),
            Some(Frame::Incomplete) => Err(BlockStoreError::WalCorruption(format!(
                "torn entry at offset {} ({} trailing bytes)",
                self.position,
                self.remaining()
            ))),
        }
    }

    /// Byte offset of the next unread frame
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Decode the next frame, advancing only past valid entries
    pub(crate) fn next_frame(&mut self) -> Option<Frame> {
        if self.remaining() == 0 {
            return None;
        }
        let frame = WalEntry::decode_frame(&self.data[self.position..]);
        if let Frame::Entry(_, consumed) = &frame {
            self.position += consumed;
        }
        Some(frame)
    }
}

impl Iterator for WalReader {
    type Item = Result<WalEntry>;

    /// Yields entries until the end of the log or the first bad frame
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                // Stop after reporting the bad frame once
                self.position = self.data.len();
                Some(Err(e))
            }
        }
    }
}
