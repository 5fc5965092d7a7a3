//! Error types for blockstore
//!
//! Provides a unified error type for the block facade and the key-value
//! engines underneath it.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::block::Hash;

/// Result type alias using BlockStoreError
pub type Result<T> = std::result::Result<T, BlockStoreError>;

/// Identifies the block a failed lookup was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLocator {
    Hash(Hash),
    Height(u64),
}

impl fmt::Display for BlockLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockLocator::Hash(hash) => write!(f, "hash {}", hash),
            BlockLocator::Height(height) => write!(f, "height {}", height),
        }
    }
}

/// Unified error type for blockstore operations
#[derive(Debug, Error)]
pub enum BlockStoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Key not found")]
    KeyNotFound,

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Another handle already owns the data directory
    #[error("data directory already in use (lock {}, holder pid {:?})", .path.display(), .pid)]
    Locked { path: PathBuf, pid: Option<u32> },

    /// A key-value engine call failed while the facade was writing or reading
    #[error("engine failed to {operation} (key {key}): {source}")]
    Engine {
        operation: &'static str,
        key: String,
        #[source]
        source: Box<BlockStoreError>,
    },

    // -------------------------------------------------------------------------
    // Block Errors
    // -------------------------------------------------------------------------
    #[error("failed to encode block: {0}")]
    Encoding(String),

    #[error("failed to decode block: {0}")]
    Decoding(String),

    #[error("invalid block hash: {0}")]
    InvalidHash(String),

    /// Missing, unreadable and undecodable records all land here
    #[error("block not found for {locator}: {reason}")]
    NotFound {
        locator: BlockLocator,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BlockStoreError {
    /// Wrap an engine failure with the operation and key it happened on
    pub fn engine(operation: &'static str, key: impl fmt::Display, source: BlockStoreError) -> Self {
        BlockStoreError::Engine {
            operation,
            key: key.to_string(),
            source: Box::new(source),
        }
    }

    /// Build a not-found error for a block lookup
    pub fn not_found(locator: BlockLocator, reason: impl fmt::Display) -> Self {
        BlockStoreError::NotFound {
            locator,
            reason: reason.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlockStoreError::NotFound { .. })
    }
}

impl From<bincode::Error> for BlockStoreError {
    fn from(e: bincode::Error) -> Self {
        BlockStoreError::Serialization(e.to_string())
    }
}
