//! Block Store
//!
//! Persists blocks on top of a [`KvStore`] and tracks the chain head.
//!
//! ## Write Sequence
//! ```text
//! write_block(B)
//!   1. encode B                          ── fail: Encoding, nothing written
//!   2. put hash(B)        → encoded B    ── fail: Engine, nothing else written
//!   3. put height(B)      → hash(B)      ── fail: Engine, step 2 stays
//!   4. head cache         := B
//!   5. put "LatestBlock"  → hash(B)      ── fail: logged, call still Ok
//! ```
//!
//! Hash and height records must land; the head pointer is best effort. A
//! lost head pointer write leaves the cache ahead of disk until restart,
//! when recovery falls back to the previous durable head.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::block::{Block, Hash};
use crate::codec::{decode_block, encode_block, encode_height, HEAD_KEY};
use crate::config::{Backend, BlockStoreConfig};
use crate::error::{BlockLocator, BlockStoreError, Result};
use crate::kv::{open_store, KvStore};

/// Height reported before any block is known
pub const GENESIS_HEIGHT: u64 = 0;

/// Persistence facade for blocks
pub struct BlockStore {
    store: Box<dyn KvStore>,

    /// Most recently recorded block. Only ever replaced as a whole; readers
    /// clone the `Arc` out and never hold the lock across other work.
    current: Mutex<Option<Arc<Block>>>,
}

impl BlockStore {
    /// Open the backend named by `config` and recover the head
    pub fn open(config: BlockStoreConfig) -> Result<Self> {
        tracing::info!(backend = %config.backend, data_dir = ?config.data_dir, "opening block store");
        let store = open_store(&config)?;
        Ok(Self::with_store(store))
    }

    /// Open by backend selector ("diskdb" / "memorydb") and optional location
    pub fn new(selector: &str, location: Option<&Path>) -> Result<Self> {
        let mut builder = BlockStoreConfig::builder().backend_name(selector)?;
        if let Some(path) = location {
            builder = builder.data_dir(path);
        }
        Self::open(builder.build())
    }

    /// Wrap an already-open engine and recover the head from it
    pub fn with_store(store: Box<dyn KvStore>) -> Self {
        let block_store = Self {
            store,
            current: Mutex::new(None),
        };
        block_store.reload_head();
        block_store
    }

    /// Rebuild the head cache from the durable head pointer
    ///
    /// A missing, malformed or dangling pointer leaves the cache empty; none
    /// of those are errors.
    pub fn reload_head(&self) -> Option<Arc<Block>> {
        let head = self.load_latest_block().map(Arc::new);
        *self.current.lock() = head.clone();
        head
    }

    fn load_latest_block(&self) -> Option<Block> {
        let raw = match self.store.get(HEAD_KEY) {
            Ok(raw) => raw,
            Err(BlockStoreError::KeyNotFound) => {
                tracing::info!("no head pointer recorded, starting with empty chain");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read head pointer, current block unset");
                return None;
            }
        };

        let hash = match Hash::from_slice(&raw) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(error = %e, "malformed head pointer, current block unset");
                return None;
            }
        };

        match self.get_block_by_hash(&hash) {
            Ok(block) => {
                tracing::info!(height = block.height(), %hash, "recovered head block");
                Some(block)
            }
            Err(e) => {
                tracing::warn!(%hash, error = %e, "head pointer does not resolve, current block unset");
                None
            }
        }
    }

    /// Persist a block and make it the current head
    pub fn write_block(&self, block: &Block) -> Result<()> {
        let height = block.height();
        tracing::debug!(height, header_hash = %block.header_hash, "writing block");

        let encoded = encode_block(block)?;
        let hash = block.hash();

        if let Err(e) = self.store.put(hash.as_bytes(), &encoded) {
            tracing::error!(height, %hash, error = %e, "failed to write block");
            return Err(BlockStoreError::engine("put block", hash, e));
        }

        if let Err(e) = self.store.put(&encode_height(height), hash.as_bytes()) {
            tracing::error!(height, %hash, error = %e, "failed to record height index");
            return Err(BlockStoreError::engine("put height index", height, e));
        }

        self.record_current_block(Arc::new(block.clone()));

        if let Err(e) = self.store.put(HEAD_KEY, hash.as_bytes()) {
            tracing::warn!(
                height,
                %hash,
                error = %e,
                "failed to record head pointer, durable head stays at the previous block"
            );
        }

        tracing::info!(height, %hash, "block written");
        Ok(())
    }

    fn record_current_block(&self, block: Arc<Block>) {
        *self.current.lock() = Some(block);
    }

    /// Fetch a block by content hash
    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Block> {
        let locator = BlockLocator::Hash(*hash);
        let bytes = self
            .store
            .get(hash.as_bytes())
            .map_err(|e| BlockStoreError::not_found(locator, e))?;
        decode_block(&bytes).map_err(|e| BlockStoreError::not_found(locator, e))
    }

    /// Fetch a block by height through the height index
    pub fn get_block_by_height(&self, height: u64) -> Result<Block> {
        let locator = BlockLocator::Height(height);
        let raw = self
            .store
            .get(&encode_height(height))
            .map_err(|e| BlockStoreError::not_found(locator, e))?;
        let hash = Hash::from_slice(&raw).map_err(|e| BlockStoreError::not_found(locator, e))?;
        self.get_block_by_hash(&hash)
            .map_err(|e| BlockStoreError::not_found(locator, e))
    }

    /// Whether a decodable record exists for `hash`
    pub fn has_block(&self, hash: &Hash) -> bool {
        self.get_block_by_hash(hash).is_ok()
    }

    /// The head block, if recovery or a write has set one
    pub fn get_current_block(&self) -> Option<Arc<Block>> {
        self.current.lock().clone()
    }

    /// Height of the head block, or `GENESIS_HEIGHT` when there is none
    pub fn get_current_height(&self) -> u64 {
        self.get_current_block()
            .map(|block| block.height())
            .unwrap_or(GENESIS_HEIGHT)
    }

    /// Content hash of the head block
    pub fn get_current_hash(&self) -> Option<Hash> {
        self.get_current_block().map(|block| block.hash())
    }

    pub fn backend(&self) -> Backend {
        self.store.backend()
    }

    /// Flush the engine and release it
    ///
    /// Dropping without `close` loses nothing already acknowledged by the
    /// disk engine's WAL; `close` only makes the next open cheaper.
    pub fn close(self) -> Result<()> {
        self.store.flush()
    }
}
