//! Storage Manager
//!
//! Owns the segment files of one data directory.
//!
//! ## Responsibilities
//! - Discover existing segments on startup
//! - Search segments newest → oldest for reads
//! - Create new segments from memtable flushes

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{BlockStoreError, Result};
use crate::memtable::{MemTable, MemTableEntry};

use super::segment::TEMP_EXTENSION;
use super::{Segment, SegmentBuilder, SegmentReader};

/// Manages the segment files
///
/// ## Concurrency:
/// - `segments`: RwLock, readers share it, a flush takes it exclusively
///   only to prepend the new reader
/// - `next_segment_id`: atomic counter
pub struct StorageManager {
    dir: PathBuf,

    /// Open readers, ordered newest → oldest
    segments: RwLock<Vec<SegmentReader>>,

    next_segment_id: AtomicU64,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// Leftover `*.tmp` files are half-written segments from an interrupted
    /// flush and are deleted; their entries are still in the WAL. Other files
    /// that do not match `seg_NNNNNN.seg` are ignored. A segment that fails
    /// validation aborts the open.
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if !file_path.is_file() {
                continue;
            }
            if Self::is_temp_file(&file_path) {
                tracing::warn!(path = %file_path.display(), "removing unfinished segment");
                fs::remove_file(&file_path)?;
            } else if let Some(id) = Self::parse_segment_id(&file_path) {
                ids.push(id);
            }
        }

        // Newest (highest id) first
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let segments = ids
            .iter()
            .map(|&id| SegmentReader::open(&Self::segment_path_in(path, id)))
            .collect::<Result<Vec<_>>>()?;

        let next_id = ids.first().map(|&id| id + 1).unwrap_or(1);

        tracing::debug!(dir = %path.display(), segments = segments.len(), next_id, "storage opened");

        Ok(Self {
            dir: path.to_path_buf(),
            segments: RwLock::new(segments),
            next_segment_id: AtomicU64::new(next_id),
        })
    }

    /// Look up a key across all segments, newest first
    ///
    /// Returns `Ok(None)` when the key is absent everywhere or the newest
    /// segment holding it has a tombstone.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let segments = self.segments.read();

        for reader in segments.iter() {
            if !reader.might_contain(key) {
                continue;
            }
            match reader.get(key) {
                Ok(found) => return Ok(found),
                Err(BlockStoreError::KeyNotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Write a memtable to a new segment and make it the newest
    pub fn flush(&self, memtable: &MemTable) -> Result<Segment> {
        if memtable.is_empty() {
            return Err(BlockStoreError::Storage(
                "cannot flush empty memtable".to_string(),
            ));
        }

        let id = self.next_segment_id.fetch_add(1, Ordering::SeqCst);
        let path = self.segment_path(id);

        let mut builder = SegmentBuilder::new(&path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(&key, &v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        let segment = builder.finish()?;

        let reader = SegmentReader::open(&path)?;
        self.segments.write().insert(0, reader);

        tracing::debug!(
            id,
            entries = segment.entry_count,
            bytes = segment.file_size,
            "memtable flushed to segment"
        );

        Ok(segment)
    }

    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn next_segment_id(&self) -> u64 {
        self.next_segment_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn segment_path(&self, id: u64) -> PathBuf {
        Self::segment_path_in(&self.dir, id)
    }

    fn segment_path_in(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("seg_{:06}.seg", id))
    }

    fn is_temp_file(path: &Path) -> bool {
        path.extension().map_or(false, |ext| ext == TEMP_EXTENSION)
    }

    /// "seg_000042.seg" → Some(42)
    fn parse_segment_id(path: &Path) -> Option<u64> {
        if path.extension()? != "seg" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        name.strip_prefix("seg_")?.parse().ok()
    }
}
