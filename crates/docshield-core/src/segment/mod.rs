//! Segment model of the host search engine.
//!
//! Documents live in immutable segments addressed by dense ids
//! `0..max_doc`. Deletions never rewrite a segment; they produce a new reader
//! with a smaller live-document set. Every read goes through the
//! [`SegmentReader`] trait, which is also the seam where security views are
//! layered on.

pub mod bitset;
pub mod memory;
pub mod reader;
pub mod schema;
pub mod snapshot;

/// Dense per-segment document id.
pub type DocId = u32;

pub use bitset::FixedBitSet;
pub use memory::{MemorySegment, MemorySegmentBuilder};
pub use reader::{CacheKey, SegmentId, SegmentReader};
pub use schema::{FieldInfo, FieldSchema};
pub use snapshot::{IndexReader, IndexSnapshot, MemoryIndex};
