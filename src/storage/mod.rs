//! Storage Module
//!
//! Persistent layer of the disk engine: immutable sorted segment files, one
//! per memtable flush, searched newest to oldest.
//!
//! ## Responsibilities
//! - Persist flushed memtables in sorted format
//! - Point lookups through an in-memory index per segment
//! - Detect damaged segment files on open (data CRC)

mod segment;
mod manager;

pub use segment::{Segment, SegmentBuilder, SegmentReader};
pub use manager::StorageManager;
