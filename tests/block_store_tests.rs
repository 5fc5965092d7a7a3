//! Tests for BlockStore
//!
//! These tests verify:
//! - Construction and backend selection
//! - Content addressing and height indexing
//! - Head tracking and recovery across restarts
//! - Tolerance of a corrupt or dangling head pointer
//! - Failure handling of each step of the write sequence

use std::path::Path;
use std::sync::Arc;
use std::thread;

use blockstore::codec::{encode_height, HEAD_KEY};
use blockstore::config::{Backend, BlockStoreConfig, WalSyncStrategy};
use blockstore::kv::{DiskStore, KvStore, MemoryStore};
use blockstore::{Block, BlockStore, BlockStoreError, Hash, Header, GENESIS_HEIGHT};
use parking_lot::Mutex;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn mock_block(height: u64) -> Block {
    Block::new(
        Header {
            height,
            parent_hash: Hash([height.wrapping_sub(1) as u8; 32]),
            state_root: "0x5a0b54d5dc17e0aadc383d2db43b0a0d3e029c4c5a0b54d5dc17e0aadc383d2d"
                .parse()
                .unwrap(),
            timestamp: 1_700_000_000_000 + height,
        },
        "0xb3f9a62087cbe321e798966883cbc445d9b924a9bbf2e010957a537ea2da7f02"
            .parse()
            .unwrap(),
        vec![format!("tx-{}", height).into_bytes()],
    )
}

fn memory_store() -> BlockStore {
    BlockStore::new("memorydb", None).unwrap()
}

fn disk_config(path: &Path) -> BlockStoreConfig {
    BlockStoreConfig::builder()
        .backend(Backend::Disk)
        .data_dir(path)
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build()
}

/// Which writes a `FaultyStore` refuses
#[derive(Clone, Copy, PartialEq)]
enum Fault {
    None,
    BlockRecord,
    HeightIndex,
    HeadPointer,
}

/// Memory store that can be told to fail one kind of put
struct FaultyStore {
    inner: MemoryStore,
    fault: Mutex<Fault>,
}

impl FaultyStore {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            fault: Mutex::new(Fault::None),
        })
    }

    fn fail(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }
}

impl KvStore for FaultyStore {
    fn put(&self, key: &[u8], value: &[u8]) -> blockstore::Result<()> {
        let refused = match *self.fault.lock() {
            Fault::None => false,
            Fault::BlockRecord => key.len() == 32,
            Fault::HeightIndex => key.len() == 8,
            Fault::HeadPointer => key == HEAD_KEY,
        };
        if refused {
            return Err(BlockStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected fault",
            )));
        }
        self.inner.put(key, value)
    }

    fn get(&self, key: &[u8]) -> blockstore::Result<Vec<u8>> {
        self.inner.get(key)
    }

    fn delete(&self, key: &[u8]) -> blockstore::Result<()> {
        self.inner.delete(key)
    }

    fn backend(&self) -> Backend {
        Backend::Memory
    }
}

/// Lets a test keep a handle on the engine the BlockStore owns
struct Shared(Arc<FaultyStore>);

impl KvStore for Shared {
    fn put(&self, key: &[u8], value: &[u8]) -> blockstore::Result<()> {
        self.0.put(key, value)
    }

    fn get(&self, key: &[u8]) -> blockstore::Result<Vec<u8>> {
        self.0.get(key)
    }

    fn delete(&self, key: &[u8]) -> blockstore::Result<()> {
        self.0.delete(key)
    }

    fn backend(&self) -> Backend {
        self.0.backend()
    }
}

fn faulty_store() -> (Arc<FaultyStore>, BlockStore) {
    let kv = FaultyStore::new();
    let store = BlockStore::with_store(Box::new(Shared(Arc::clone(&kv))));
    (kv, store)
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_new_memory_store() {
    let store = memory_store();
    assert_eq!(store.backend(), Backend::Memory);
}

#[test]
fn test_new_disk_store() {
    let temp = TempDir::new().unwrap();
    let store = BlockStore::new("diskdb", Some(temp.path())).unwrap();

    assert_eq!(store.backend(), Backend::Disk);
    assert!(temp.path().join("wal.log").exists());
    assert!(temp.path().join("segments").is_dir());
}

#[test]
fn test_unknown_backend_is_config_error() {
    let result = BlockStore::new("leveldb-ng", None);
    assert!(matches!(result, Err(BlockStoreError::Config(_))));
}

#[test]
fn test_disk_backend_without_location_is_config_error() {
    let result = BlockStore::new("diskdb", None);
    assert!(matches!(result, Err(BlockStoreError::Config(_))));
}

#[test]
fn test_disk_backend_open_failure_aborts_construction() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not-a-dir");
    std::fs::write(&file_path, b"occupied").unwrap();

    let result = BlockStore::open(disk_config(&file_path));
    assert!(matches!(result, Err(BlockStoreError::Io(_))));
}

// =============================================================================
// Empty Store Tests
// =============================================================================

#[test]
fn test_empty_store_has_no_head() {
    let store = memory_store();

    assert!(store.get_current_block().is_none());
    assert_eq!(store.get_current_height(), GENESIS_HEIGHT);
    assert_eq!(store.get_current_height(), 0);
    assert!(store.get_current_hash().is_none());
}

#[test]
fn test_empty_disk_store_has_no_head() {
    let temp = TempDir::new().unwrap();
    let store = BlockStore::open(disk_config(temp.path())).unwrap();

    assert!(store.get_current_block().is_none());
    assert_eq!(store.get_current_height(), 0);
}

// =============================================================================
// Write / Read Tests
// =============================================================================

#[test]
fn test_write_block() {
    let store = memory_store();
    store.write_block(&mock_block(1)).unwrap();
}

#[test]
fn test_get_block_by_hash() {
    let store = memory_store();
    let block = mock_block(1);
    store.write_block(&block).unwrap();

    let saved = store.get_block_by_hash(&block.hash()).unwrap();
    assert_eq!(saved.header_hash, block.header_hash);
    assert_eq!(saved, block);
}

#[test]
fn test_get_block_by_height() {
    let store = memory_store();
    let block = mock_block(1);
    store.write_block(&block).unwrap();

    let by_height = store.get_block_by_height(1).unwrap();
    let by_hash = store.get_block_by_hash(&block.hash()).unwrap();
    assert_eq!(by_height, by_hash);
    assert_eq!(by_height.header_hash, block.header_hash);
}

#[test]
fn test_get_current_block() {
    let store = memory_store();
    let block = mock_block(1);
    store.write_block(&block).unwrap();

    let current = store.get_current_block().unwrap();
    assert_eq!(current.header_hash, block.header_hash);
    assert_eq!(*current, block);
    assert_eq!(store.get_current_height(), 1);
    assert_eq!(store.get_current_hash(), Some(block.hash()));
}

#[test]
fn test_head_follows_latest_write() {
    let store = memory_store();
    for height in 1..=5 {
        store.write_block(&mock_block(height)).unwrap();
        assert_eq!(store.get_current_height(), height);
    }

    for height in 1..=5 {
        assert_eq!(store.get_block_by_height(height).unwrap(), mock_block(height));
    }
}

#[test]
fn test_height_gaps_are_tolerated() {
    let store = memory_store();
    store.write_block(&mock_block(1)).unwrap();
    store.write_block(&mock_block(10)).unwrap();

    assert_eq!(store.get_block_by_height(10).unwrap(), mock_block(10));
    assert!(store.get_block_by_height(5).unwrap_err().is_not_found());
    assert_eq!(store.get_current_height(), 10);
}

#[test]
fn test_rewriting_a_height_repoints_the_index() {
    let store = memory_store();
    let first = mock_block(2);
    let mut second = mock_block(2);
    second.transactions.push(b"extra".to_vec());

    store.write_block(&first).unwrap();
    store.write_block(&second).unwrap();

    assert_eq!(store.get_block_by_height(2).unwrap(), second);
    // The older record stays reachable by its own hash
    assert_eq!(store.get_block_by_hash(&first.hash()).unwrap(), first);
}

#[test]
fn test_layout_matches_key_scheme() {
    let kv = FaultyStore::new();
    let store = BlockStore::with_store(Box::new(Shared(Arc::clone(&kv))));
    let block = mock_block(3);
    store.write_block(&block).unwrap();

    let hash = block.hash();
    assert_eq!(kv.get(&encode_height(3)).unwrap(), hash.as_bytes().to_vec());
    assert_eq!(kv.get(HEAD_KEY).unwrap(), hash.as_bytes().to_vec());
    assert!(!kv.get(hash.as_bytes()).unwrap().is_empty());
}

#[test]
fn test_has_block() {
    let store = memory_store();
    let block = mock_block(1);
    assert!(!store.has_block(&block.hash()));

    store.write_block(&block).unwrap();
    assert!(store.has_block(&block.hash()));
}

// =============================================================================
// Not Found Tests
// =============================================================================

#[test]
fn test_get_block_by_absent_hash() {
    let store = memory_store();
    let hash = Hash([0xee; 32]);

    let err = store.get_block_by_hash(&hash).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains(&hash.to_string()));
}

#[test]
fn test_get_block_by_absent_height() {
    let store = memory_store();
    store.write_block(&mock_block(1)).unwrap();

    let err = store.get_block_by_height(99).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("height 99"));
}

#[test]
fn test_undecodable_record_is_not_found() {
    let (kv, store) = faulty_store();
    let hash = Hash([0x11; 32]);
    kv.put(hash.as_bytes(), b"not a block").unwrap();

    assert!(store.get_block_by_hash(&hash).unwrap_err().is_not_found());
}

#[test]
fn test_height_index_with_malformed_hash_is_not_found() {
    let (kv, store) = faulty_store();
    kv.put(&encode_height(4), b"short").unwrap();

    assert!(store.get_block_by_height(4).unwrap_err().is_not_found());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_head_after_restart() {
    let temp = TempDir::new().unwrap();
    let block = mock_block(1);

    {
        let store = BlockStore::open(disk_config(temp.path())).unwrap();
        store.write_block(&block).unwrap();
    }

    let store = BlockStore::open(disk_config(temp.path())).unwrap();
    assert_eq!(store.get_current_block().as_deref(), Some(&block));
    assert_eq!(store.get_current_height(), 1);
    assert_eq!(store.get_block_by_height(1).unwrap(), block);
}

#[test]
fn test_recover_head_after_close() {
    let temp = TempDir::new().unwrap();

    {
        let store = BlockStore::open(disk_config(temp.path())).unwrap();
        for height in 1..=3 {
            store.write_block(&mock_block(height)).unwrap();
        }
        store.close().unwrap();
    }

    let store = BlockStore::open(disk_config(temp.path())).unwrap();
    assert_eq!(store.get_current_height(), 3);
    for height in 1..=3 {
        assert_eq!(store.get_block_by_height(height).unwrap(), mock_block(height));
    }
}

#[test]
fn test_second_open_of_live_directory_is_refused() {
    let temp = TempDir::new().unwrap();
    let node = BlockStore::open(disk_config(temp.path())).unwrap();
    node.write_block(&mock_block(1)).unwrap();

    let second = BlockStore::open(disk_config(temp.path()));
    assert!(matches!(second, Err(BlockStoreError::Locked { .. })));
    drop(second);

    // Writes after the refused open must survive a restart
    node.write_block(&mock_block(2)).unwrap();
    drop(node);

    let store = BlockStore::open(disk_config(temp.path())).unwrap();
    assert_eq!(store.get_current_height(), 2);
    assert_eq!(store.get_block_by_height(2).unwrap(), mock_block(2));
}

#[test]
fn test_reopen_after_interrupted_segment_write() {
    let temp = TempDir::new().unwrap();
    {
        let store = BlockStore::open(disk_config(temp.path())).unwrap();
        store.write_block(&mock_block(1)).unwrap();
    }
    std::fs::write(temp.path().join("segments").join("seg_000099.seg.tmp"), b"").unwrap();

    let store = BlockStore::open(disk_config(temp.path())).unwrap();
    assert_eq!(store.get_current_height(), 1);
    assert_eq!(store.get_block_by_height(1).unwrap(), mock_block(1));
}

#[test]
fn test_recover_head_across_memtable_flushes() {
    let temp = TempDir::new().unwrap();
    let config = BlockStoreConfig::builder()
        .backend(Backend::Disk)
        .data_dir(temp.path())
        .memtable_size_limit(256)
        .build();

    {
        let store = BlockStore::open(config.clone()).unwrap();
        for height in 1..=20 {
            store.write_block(&mock_block(height)).unwrap();
        }
    }

    let store = BlockStore::open(config).unwrap();
    assert_eq!(store.get_current_height(), 20);
    assert_eq!(store.get_block_by_height(7).unwrap(), mock_block(7));
}

#[test]
fn test_corrupt_head_pointer_is_tolerated() {
    let temp = TempDir::new().unwrap();

    {
        let kv = DiskStore::open(temp.path(), WalSyncStrategy::EveryWrite, 1024 * 1024).unwrap();
        kv.put(HEAD_KEY, &[0xab; 32]).unwrap();
    }

    let store = BlockStore::open(disk_config(temp.path())).unwrap();
    assert!(store.get_current_block().is_none());
    assert_eq!(store.get_current_height(), 0);
}

#[test]
fn test_head_pointer_to_undecodable_block_is_tolerated() {
    let kv = MemoryStore::new();
    let hash = Hash([0x42; 32]);
    kv.put(hash.as_bytes(), b"garbage").unwrap();
    kv.put(HEAD_KEY, hash.as_bytes()).unwrap();

    let store = BlockStore::with_store(Box::new(kv));
    assert!(store.get_current_block().is_none());
}

#[test]
fn test_memory_backend_is_not_durable() {
    let first = memory_store();
    first.write_block(&mock_block(1)).unwrap();
    drop(first);

    let second = memory_store();
    assert!(second.get_current_block().is_none());
}

// =============================================================================
// Write Failure Tests
// =============================================================================

#[test]
fn test_block_record_failure_writes_nothing() {
    let (kv, store) = faulty_store();
    let block = mock_block(1);
    kv.fail(Fault::BlockRecord);

    let err = store.write_block(&block).unwrap_err();
    assert!(matches!(err, BlockStoreError::Engine { operation: "put block", .. }));

    assert!(kv.get(&encode_height(1)).is_err());
    assert!(kv.get(HEAD_KEY).is_err());
    assert!(store.get_current_block().is_none());
}

#[test]
fn test_height_index_failure_keeps_block_record() {
    let (kv, store) = faulty_store();
    let block = mock_block(1);
    kv.fail(Fault::HeightIndex);

    let err = store.write_block(&block).unwrap_err();
    assert!(matches!(err, BlockStoreError::Engine { operation: "put height index", .. }));

    // Step 2 already landed and is not rolled back
    assert_eq!(store.get_block_by_hash(&block.hash()).unwrap(), block);
    assert!(store.get_block_by_height(1).unwrap_err().is_not_found());
    assert!(store.get_current_block().is_none());
    assert!(kv.get(HEAD_KEY).is_err());
}

#[test]
fn test_head_pointer_failure_is_best_effort() {
    let (kv, store) = faulty_store();
    let first = mock_block(1);
    let second = mock_block(2);

    store.write_block(&first).unwrap();
    kv.fail(Fault::HeadPointer);
    store.write_block(&second).unwrap();

    // Cache moved ahead, durable pointer did not
    assert_eq!(store.get_current_block().as_deref(), Some(&second));
    assert_eq!(kv.get(HEAD_KEY).unwrap(), first.hash().as_bytes().to_vec());
    assert_eq!(store.get_block_by_height(2).unwrap(), second);

    // A restart sees the previous head
    let restarted = BlockStore::with_store(Box::new(Shared(Arc::clone(&kv))));
    assert_eq!(restarted.get_current_block().as_deref(), Some(&first));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_and_readers() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(BlockStore::open(disk_config(temp.path())).unwrap());

    let mut handles = Vec::new();
    for worker in 0..4u64 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..25u64 {
                let height = worker * 100 + i + 1;
                store.write_block(&mock_block(height)).unwrap();

                // Whatever head a reader sees is a complete, stored block
                let head = store.get_current_block().unwrap();
                assert_eq!(*head, mock_block(head.height()));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for worker in 0..4u64 {
        for i in 0..25u64 {
            let height = worker * 100 + i + 1;
            assert_eq!(store.get_block_by_height(height).unwrap(), mock_block(height));
        }
    }
}
