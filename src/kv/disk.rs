//! Durable key-value engine
//!
//! Coordinates the WAL, memtable and segment storage of one data directory.
//!
//! ## Responsibilities
//! - Log every mutation before applying it
//! - Flush the memtable to a segment when it outgrows its limit
//! - Replay the log on open after an unclean shutdown

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::{Backend, WalSyncStrategy};
use crate::error::{BlockStoreError, Result};
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::StorageManager;
use crate::wal::{Operation, WalRecovery, WalWriter};

use super::lock::DirLock;
use super::KvStore;

/// Disk-backed store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Writes** (put/delete/flush): serialized by `write_lock`, which is
///   taken before the WAL lock.
/// - **Reads** (get): no write lock. The memtable and segment list have
///   their own reader/writer locks. A flush publishes the new segment before
///   clearing the memtable, so a reader finds a key in one or the other.
/// - **Other handles**: `{data_dir}/LOCK` is held exclusively while the store
///   is open; a second open of the same directory fails with `Locked`.
pub struct DiskStore {
    data_dir: PathBuf,
    wal: Mutex<WalWriter>,
    memtable: MemTable,
    storage: StorageManager,
    memtable_size_limit: usize,
    write_lock: Mutex<()>,
    /// Held for the life of the store; dropped last
    _dir_lock: DirLock,
}

impl DiskStore {
    const WAL_FILENAME: &'static str = "wal.log";
    const SEGMENT_DIR: &'static str = "segments";

    /// Open or create a store rooted at `data_dir`
    ///
    /// On startup:
    /// 1. Create the data directory and lock it (`Locked` if already held)
    /// 2. Load existing segments
    /// 3. Replay the WAL if one exists, and flush what it held
    /// 4. Start a fresh WAL
    pub fn open(
        data_dir: &Path,
        wal_sync_strategy: WalSyncStrategy,
        memtable_size_limit: usize,
    ) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let dir_lock = DirLock::acquire(data_dir)?;
        let segment_dir = data_dir.join(Self::SEGMENT_DIR);
        let wal_path = data_dir.join(Self::WAL_FILENAME);

        let storage = StorageManager::open(&segment_dir)?;
        let memtable = MemTable::new();

        if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;

            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                tracing::info!(
                    recovered = result.entries_recovered,
                    corrupted = result.entries_corrupted,
                    last_lsn = result.last_lsn,
                    "WAL recovery"
                );
            }

            for entry in entries {
                match entry.operation {
                    Operation::Put { key, value } => {
                        memtable.put(key, value);
                    }
                    Operation::Delete { key } => {
                        memtable.delete(key);
                    }
                }
            }

            // Recovered data must reach a segment before the log is reset
            if !memtable.is_empty() {
                tracing::debug!(entries = memtable.entry_count(), "flushing recovered entries");
                storage.flush(&memtable)?;
                memtable.clear();
            }
        }

        let wal = WalWriter::open(&wal_path, wal_sync_strategy)?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            wal: Mutex::new(wal),
            memtable,
            storage,
            memtable_size_limit,
            write_lock: Mutex::new(()),
            _dir_lock: dir_lock,
        })
    }

    /// Look up a key: memtable first, then segments newest → oldest
    pub fn get_value(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.memtable.get(key) {
            return Ok(match entry {
                MemTableEntry::Value(value) => Some(value),
                MemTableEntry::Tombstone => None,
            });
        }
        self.storage.get(key)
    }

    fn apply(&self, operation: Operation) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        self.wal.lock().append(operation.clone())?;

        let new_size = match operation {
            Operation::Put { key, value } => self.memtable.put(key, value),
            Operation::Delete { key } => self.memtable.delete(key),
        };

        // Already logged and readable; a failed flush is retried on the next put
        if new_size >= self.memtable_size_limit {
            if let Err(e) = self.flush_internal() {
                tracing::warn!(
                    error = %e,
                    memtable_size = new_size,
                    "memtable flush failed, entries stay in the WAL"
                );
            }
        }
        Ok(())
    }

    /// Flush memtable to a segment and reset the WAL (write lock held)
    fn flush_internal(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }
        self.storage.flush(&self.memtable)?;
        self.memtable.clear();
        self.wal.lock().truncate()?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn segment_dir(&self) -> &Path {
        self.storage.dir()
    }

    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn segment_count(&self) -> usize {
        self.storage.segment_count()
    }
}

impl KvStore for DiskStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.apply(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.get_value(key)?.ok_or(BlockStoreError::KeyNotFound)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.apply(Operation::Delete { key: key.to_vec() })
    }

    /// Flush the memtable and sync the WAL
    fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()?;
        self.wal.lock().sync()
    }

    fn backend(&self) -> Backend {
        Backend::Disk
    }
}
