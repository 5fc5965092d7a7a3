//! MemTable Module
//!
//! In-memory sorted table for recent writes. The disk engine buffers writes
//! here until a flush; the memory engine uses it as its only layer.
//!
//! BTreeMap wrapped in RwLock:
//! - Ordered keys (segment files are written in key order)
//! - Many concurrent readers, one writer

mod table;

pub use table::MemTable;

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}

impl MemTableEntry {
    /// Bytes this entry contributes to the table size (key excluded)
    pub fn value_len(&self) -> usize {
        match self {
            MemTableEntry::Value(v) => v.len(),
            MemTableEntry::Tombstone => 0,
        }
    }
}
