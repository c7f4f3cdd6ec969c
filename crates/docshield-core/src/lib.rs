//! DocShield Core - segment model, search and document/field-level security.
//!
//! This crate provides the filtering engine that restricts what a request can
//! read from an index, along with the in-memory segment engine it runs
//! against.
//!
//! # Modules
//!
//! - [`segment`] - Immutable segments, snapshots and the reader traits
//! - [`query`] - Filter evaluation, search and the result cache
//! - [`security`] - Security contexts, token propagation and filtered views

pub mod error;
pub mod query;
pub mod security;
pub mod segment;

pub use error::{Error, Result};
pub use query::{FilterEvaluator, ResultCache, SearchHit, SearchQuery, SearchResponse, Searcher};
pub use security::{
    AbsentContextPolicy, CacheKeyMode, FieldVisibilitySpec, FilteredIndexView, FilteredSegmentView,
    IndexSettings, RequestContext, SecurityConfig, SecurityContext, SecurityContextCodec,
    SecurityError, SecurityResult, WrapOrchestrator,
};
pub use segment::{
    CacheKey, DocId, FieldSchema, FixedBitSet, IndexReader, IndexSnapshot, MemoryIndex,
    MemorySegment, SegmentId, SegmentReader,
};

/// Re-export protocol types.
pub use docshield_proto as proto;
