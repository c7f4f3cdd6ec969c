//! Read capability shared by segments and the views that decorate them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use docshield_proto::Value;

use super::bitset::FixedBitSet;
use super::schema::FieldSchema;
use super::DocId;
use crate::error::Result;

static NEXT_CACHE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a segment, unique within its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.0)
    }
}

/// Structural identity used by caches layered above readers.
///
/// A key is a process-unique id plus an optional scope digest. Plain
/// segments report unscoped keys; a filtered view may scope the key with the
/// fingerprint of the security context it enforces, so that two views of the
/// same segment under different contexts never share cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    id: u64,
    scope: Option<[u8; 32]>,
}

impl CacheKey {
    /// Allocate a fresh, process-unique key.
    pub fn unique() -> Self {
        Self {
            id: NEXT_CACHE_ID.fetch_add(1, Ordering::Relaxed),
            scope: None,
        }
    }

    /// Derive a key scoped by `fingerprint`.
    ///
    /// Scoping an already scoped key chains the digests, so nested views
    /// remain distinguishable.
    pub fn scoped(self, fingerprint: [u8; 32]) -> Self {
        let scope = match self.scope {
            None => fingerprint,
            Some(existing) => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(&existing);
                hasher.update(&fingerprint);
                *hasher.finalize().as_bytes()
            }
        };
        Self {
            id: self.id,
            scope: Some(scope),
        }
    }

    /// The underlying id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The scope digest, if any.
    pub fn scope(&self) -> Option<&[u8; 32]> {
        self.scope.as_ref()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            None => write!(f, "{}", self.id),
            Some(scope) => write!(f, "{}@{}", self.id, hex::encode(&scope[..8])),
        }
    }
}

/// Read operations on one immutable segment.
///
/// Filtering views implement this trait by decorating another reader: they
/// answer liveness, counts and field enumeration from their own derived state
/// and delegate everything else.
pub trait SegmentReader: Send + Sync + fmt::Debug {
    /// Segment identifier.
    fn segment_id(&self) -> SegmentId;

    /// Name of the index this segment belongs to.
    fn index_name(&self) -> &str;

    /// One greater than the largest document id.
    fn max_doc(&self) -> u32;

    /// Number of live documents.
    fn num_docs(&self) -> u32;

    /// Live documents, or `None` when every id in `0..max_doc` is live.
    fn live_docs(&self) -> Option<&FixedBitSet>;

    /// Check whether `doc` is live.
    fn is_live(&self, doc: DocId) -> bool {
        doc < self.max_doc() && self.live_docs().map_or(true, |live| live.get(doc))
    }

    /// Check whether any document is hidden or deleted.
    fn has_deletions(&self) -> bool {
        self.num_docs() < self.max_doc()
    }

    /// Fields visible through this reader.
    fn field_schema(&self) -> &FieldSchema;

    /// Stored field values of `doc`, in field-number order.
    fn stored_fields(&self, doc: DocId) -> Result<Vec<(String, Value)>>;

    /// Sorted document ids containing `term` in `field`.
    fn postings(&self, field: &str, term: &str) -> Option<&[DocId]>;

    /// Terms of `field`, sorted.
    fn terms(&self, field: &str) -> Vec<&str>;

    /// Key identifying the segment's immutable core data.
    fn core_cache_key(&self) -> CacheKey;

    /// Key identifying this reader, including its liveness state.
    fn reader_cache_key(&self) -> CacheKey;
}
