//! Segment Reader
//!
//! Opens segment files and answers point lookups through an in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{BlockStoreError, Result};

use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Reader for segment files
///
/// The file handle sits behind a mutex so lookups take `&self` and many
/// readers can share one `SegmentReader`.
#[derive(Debug)]
pub struct SegmentReader {
    path: PathBuf,
    file: Mutex<BufReader<File>>,
    /// key → file offset of its entry
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
}

impl SegmentReader {
    /// Open a segment, validating header, footer and data checksum
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let corrupt = |msg: String| {
            BlockStoreError::Storage(format!("segment {}: {}", path.display(), msg))
        };

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(format!("file too small ({} bytes)", file_size)));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        if &header[0..4] != MAGIC {
            return Err(corrupt(format!("invalid magic {:?}", &header[0..4])));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(corrupt(format!("unsupported version {}", version)));
        }
        let entry_count = u64::from_le_bytes(le_array(&header[6..14]));

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;
        let index_offset = u64::from_le_bytes(le_array(&footer[0..8]));
        let data_crc = u32::from_le_bytes(le_array(&footer[8..12]));

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt(format!("index offset {} out of range", index_offset)));
        }

        // Data block checksum
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
        file.read_exact(&mut data)?;
        if crc32fast::hash(&data) != data_crc {
            return Err(corrupt("data checksum mismatch".to_string()));
        }

        // Index block follows the data block directly
        let mut index_data = vec![0u8; (file_size - FOOTER_SIZE - index_offset) as usize];
        file.read_exact(&mut index_data)?;
        let index = Self::parse_index(&index_data).ok_or_else(|| corrupt("malformed index block".to_string()))?;

        if index.len() as u64 != entry_count {
            return Err(corrupt(format!(
                "header says {} entries, index has {}",
                entry_count,
                index.len()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::new(file)),
            index,
            entry_count,
        })
    }

    /// [key_len(4)][offset(8)][key] repeated
    fn parse_index(mut data: &[u8]) -> Option<BTreeMap<Vec<u8>, u64>> {
        let mut index = BTreeMap::new();
        while !data.is_empty() {
            let key_len = u32::from_le_bytes(le_array(data.get(0..4)?)) as usize;
            let offset = u64::from_le_bytes(le_array(data.get(4..12)?));
            let key = data.get(12..12 + key_len)?;
            index.insert(key.to_vec(), offset);
            data = &data[12 + key_len..];
        }
        Some(index)
    }

    /// Look up a key
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key found but is a tombstone
    /// - `Err(KeyNotFound)`: key not in this segment
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let offset = *self.index.get(key).ok_or(BlockStoreError::KeyNotFound)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; 8];
        file.read_exact(&mut header)?;
        let key_len = u32::from_le_bytes(le_array(&header[0..4]));
        let val_len = u32::from_le_bytes(le_array(&header[4..8]));

        file.seek(SeekFrom::Current(i64::from(key_len)))?;

        if val_len == TOMBSTONE_MARKER {
            return Ok(None);
        }

        let mut value = vec![0u8; val_len as usize];
        file.read_exact(&mut value)?;
        Ok(Some(value))
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// False only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }
}

/// Copy a slice of known length into a fixed array
fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}
