//! # blockstore
//!
//! Block persistence for a blockchain node:
//! - Content-addressed block records (key = SHA-256 of the block)
//! - Height index (8-byte big-endian height → block hash)
//! - Head pointer with crash recovery into an in-memory head cache
//! - Pluggable key-value engine: durable (WAL + segments) or in-memory
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        BlockStore                            │
//! │        write_block / get_block_by_* / head cache             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  codec: block bytes, height keys
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   KvStore (put/get/delete)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  DiskStore  │          │ MemoryStore │
//!   │ WAL+MemTable│          │  MemTable   │
//!   └──────┬──────┘          └─────────────┘
//!          ▼
//!   ┌─────────────┐
//!   │  Segments   │
//!   └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use blockstore::{Block, BlockStore, Hash, Header};
//!
//! let store = BlockStore::new("diskdb", Some(std::path::Path::new("./chain")))?;
//! let block = Block::new(
//!     Header { height: 1, parent_hash: Hash::ZERO, state_root: Hash::ZERO, timestamp: 0 },
//!     Hash::ZERO,
//!     vec![],
//! );
//! store.write_block(&block)?;
//! assert_eq!(store.get_current_height(), 1);
//! # Ok::<(), blockstore::BlockStoreError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod block;
pub mod codec;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod kv;

pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use block::{Block, Hash, Header};
pub use config::{Backend, BlockStoreConfig};
pub use error::{BlockLocator, BlockStoreError, Result};
pub use kv::KvStore;
pub use store::{BlockStore, GENESIS_HEIGHT};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blockstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
