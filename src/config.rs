//! Configuration for blockstore
//!
//! Centralized configuration with sensible defaults.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{BlockStoreError, Result};

/// Which key-value engine backs the block store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Durable engine: WAL + memtable + on-disk segments
    Disk,

    /// Volatile engine: sorted map, lost when the store is dropped
    Memory,
}

impl Backend {
    pub const DISK_NAME: &'static str = "diskdb";
    pub const MEMORY_NAME: &'static str = "memorydb";

    /// Selector string for this backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Disk => Self::DISK_NAME,
            Backend::Memory => Self::MEMORY_NAME,
        }
    }
}

impl FromStr for Backend {
    type Err = BlockStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            Self::DISK_NAME => Ok(Backend::Disk),
            Self::MEMORY_NAME => Ok(Backend::Memory),
            other => Err(BlockStoreError::Config(format!(
                "unsupported backend type {:?} (expected {:?} or {:?})",
                other,
                Self::DISK_NAME,
                Self::MEMORY_NAME
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main configuration for a block store instance
#[derive(Debug, Clone)]
pub struct BlockStoreConfig {
    // -------------------------------------------------------------------------
    // Backend Configuration
    // -------------------------------------------------------------------------
    /// Engine selection
    pub backend: Backend,

    /// Root directory for the durable engine. Required for `Backend::Disk`,
    /// ignored for `Backend::Memory`.
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── segments/        (segment files)
    pub data_dir: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Max size of memtable before flush (in bytes)
    pub memtable_size_limit: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for BlockStoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            data_dir: None,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 4 * 1024 * 1024, // 4 MB
        }
    }
}

impl BlockStoreConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Durable config rooted at `path` with default tuning
    pub fn disk(path: impl Into<PathBuf>) -> Self {
        Self::builder().backend(Backend::Disk).data_dir(path).build()
    }

    /// Volatile config
    pub fn memory() -> Self {
        Self::builder().backend(Backend::Memory).build()
    }
}

/// Builder for BlockStoreConfig
#[derive(Default)]
pub struct ConfigBuilder {
    config: BlockStoreConfig,
}

impl ConfigBuilder {
    /// Set the backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set the backend from its selector string ("diskdb" / "memorydb")
    pub fn backend_name(mut self, name: &str) -> Result<Self> {
        self.config.backend = name.parse()?;
        Ok(self)
    }

    /// Set the data directory (root for all durable storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(path.into());
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    pub fn build(self) -> BlockStoreConfig {
        self.config
    }
}
