//! Volatile key-value engine

use crate::config::Backend;
use crate::error::{BlockStoreError, Result};
use crate::memtable::{MemTable, MemTableEntry};

use super::KvStore;

/// In-memory store over a single memtable
///
/// Deletes remove the key outright; there is no older layer a tombstone
/// would need to shadow.
#[derive(Default)]
pub struct MemoryStore {
    table: MemTable,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.table.put(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        match self.table.get(key) {
            Some(MemTableEntry::Value(value)) => Ok(value),
            Some(MemTableEntry::Tombstone) | None => Err(BlockStoreError::KeyNotFound),
        }
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.table.remove(key);
        Ok(())
    }

    fn backend(&self) -> Backend {
        Backend::Memory
    }
}
