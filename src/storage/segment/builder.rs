//! Segment Builder
//!
//! Writes sorted key-value entries to a new segment file.
//!
//! The file is built as `<name>.tmp` and renamed into place once complete
//! and synced, so a segment under its final name is always whole.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{BlockStoreError, Result};

use super::{Segment, HEADER_SIZE, MAGIC, TEMP_EXTENSION, TOMBSTONE_MARKER, VERSION};

/// Builder for creating new segments from sorted entries
pub struct SegmentBuilder {
    /// Final name, taken on `finish()`
    path: PathBuf,
    /// Name while being written
    temp_path: PathBuf,
    writer: BufWriter<File>,
    entry_count: u64,
    /// Offset the next entry will be written at
    current_offset: u64,
    /// key → file offset of its entry
    index: Vec<(Vec<u8>, u64)>,
    /// Running CRC over the data block
    data_hasher: crc32fast::Hasher,
}

impl SegmentBuilder {
    /// Create the file and write its header
    ///
    /// Call `add()`/`add_tombstone()` in strictly increasing key order, then
    /// `finish()`.
    pub fn new(path: &Path) -> Result<Self> {
        let temp_path = Self::temp_path_for(path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?; // count, patched in finish

        Ok(Self {
            path: path.to_path_buf(),
            temp_path,
            writer,
            entry_count: 0,
            current_offset: HEADER_SIZE,
            index: Vec::new(),
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_entry(key, Some(value))
    }

    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.write_entry(key, None)
    }

    fn write_entry(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        if let Some((last, _)) = self.index.last() {
            if key <= last.as_slice() {
                return Err(BlockStoreError::Storage(format!(
                    "segment keys out of order: {:?} after {:?}",
                    key, last
                )));
            }
        }

        let key_len = Self::len_u32(key.len())?;
        let val_len = match value {
            Some(v) if v.len() >= TOMBSTONE_MARKER as usize => {
                return Err(BlockStoreError::Storage(format!(
                    "value too large for segment: {} bytes",
                    v.len()
                )));
            }
            Some(v) => v.len() as u32,
            None => TOMBSTONE_MARKER,
        };

        let mut entry = Vec::with_capacity(8 + key.len() + value.map_or(0, |v| v.len()));
        entry.extend_from_slice(&key_len.to_le_bytes());
        entry.extend_from_slice(&val_len.to_le_bytes());
        entry.extend_from_slice(key);
        if let Some(v) = value {
            entry.extend_from_slice(v);
        }

        self.writer.write_all(&entry)?;
        self.data_hasher.update(&entry);

        self.index.push((key.to_vec(), self.current_offset));
        self.current_offset += entry.len() as u64;
        self.entry_count += 1;
        Ok(())
    }

    /// Write index block and footer, fsync, move into place, and return metadata
    pub fn finish(mut self) -> Result<Segment> {
        let index_offset = self.current_offset;

        for (key, offset) in &self.index {
            self.writer.write_all(&Self::len_u32(key.len())?.to_le_bytes())?;
            self.writer.write_all(&offset.to_le_bytes())?;
            self.writer.write_all(key)?;
        }

        let data_crc = self.data_hasher.finalize();
        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;
        self.writer.flush()?;

        let mut file = self.writer.into_inner().map_err(|e| {
            BlockStoreError::Storage(format!("failed to flush segment: {}", e))
        })?;
        file.seek(SeekFrom::Start(6))?; // after magic + version
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;
        let file_size = file.metadata()?.len();
        drop(file);

        fs::rename(&self.temp_path, &self.path)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            sync_dir(dir)?;
        }

        let min_key = self.index.first().map(|(k, _)| k.clone()).unwrap_or_default();
        let max_key = self.index.last().map(|(k, _)| k.clone()).unwrap_or_default();

        Ok(Segment {
            path: self.path,
            entry_count: self.entry_count,
            min_key,
            max_key,
            file_size,
        })
    }

    /// `seg_000001.seg` → `seg_000001.seg.tmp`
    pub fn temp_path_for(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(TEMP_EXTENSION);
        PathBuf::from(name)
    }

    fn len_u32(len: usize) -> Result<u32> {
        u32::try_from(len)
            .map_err(|_| BlockStoreError::Storage(format!("key too large for segment: {} bytes", len)))
    }
}

/// Persist a rename by syncing the directory entry
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
