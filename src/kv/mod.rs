//! Key-Value Engine Module
//!
//! The byte-string store the block facade sits on, and the selection step
//! that builds one from configuration.
//!
//! ## Backends
//! - `diskdb`   → [`DiskStore`]: WAL + memtable + segments, survives restarts
//! - `memorydb` → [`MemoryStore`]: sorted map, gone when dropped
//!
//! A `diskdb` directory is owned by one open store at a time.

mod disk;
mod lock;
mod memory;

pub use disk::DiskStore;
pub use lock::DirLock;
pub use memory::MemoryStore;

use crate::config::{Backend, BlockStoreConfig};
use crate::error::{BlockStoreError, Result};

/// Capability every backend provides
///
/// Single-key `put`/`get` are atomic. Nothing spanning several keys is.
pub trait KvStore: Send + Sync {
    /// Insert or overwrite a key
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Fetch a key; `Err(KeyNotFound)` when absent
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Remove a key; absent keys are not an error
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Make every acknowledged write durable
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Which backend this is
    fn backend(&self) -> Backend;
}

/// Build the backend named by the config
///
/// No retries: a failed open is returned as is.
pub fn open_store(config: &BlockStoreConfig) -> Result<Box<dyn KvStore>> {
    match config.backend {
        Backend::Disk => {
            let dir = config.data_dir.as_deref().ok_or_else(|| {
                BlockStoreError::Config(format!(
                    "backend {} requires a data directory",
                    Backend::Disk
                ))
            })?;
            tracing::debug!(path = %dir.display(), "creating file-based block store");
            Ok(Box::new(DiskStore::open(
                dir,
                config.wal_sync_strategy,
                config.memtable_size_limit,
            )?))
        }
        Backend::Memory => {
            tracing::debug!("creating memory-based block store");
            Ok(Box::new(MemoryStore::new()))
        }
    }
}
