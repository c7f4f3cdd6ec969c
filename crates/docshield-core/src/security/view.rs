//! Read-only filtered views over segments and snapshots.
//!
//! A view answers liveness, document counts and field enumeration from its
//! [`FilteredState`]. Postings, the term dictionary and stored field content
//! come from the wrapped reader unchanged; consumers restrict what they
//! return to [`SegmentReader::field_schema`].

use std::sync::Arc;

use docshield_proto::Value;

use super::error::SecurityResult;
use super::orchestrator::WrapPlan;
use super::segment_filter::FilteredState;
use crate::error::Result;
use crate::segment::{CacheKey, DocId, FieldSchema, FixedBitSet, IndexReader, SegmentId, SegmentReader};

/// A segment seen through a security context.
#[derive(Debug)]
pub struct FilteredSegmentView {
    inner: Arc<dyn SegmentReader>,
    state: FilteredState,
    core_key: CacheKey,
    reader_key: CacheKey,
}

impl FilteredSegmentView {
    /// Wrap `inner` with `state`.
    ///
    /// With a `scope`, the view's cache keys are the inner keys scoped by it;
    /// without one they are passed through.
    pub fn new(inner: Arc<dyn SegmentReader>, state: FilteredState, scope: Option<[u8; 32]>) -> Self {
        let (core_key, reader_key) = match scope {
            Some(scope) => (
                inner.core_cache_key().scoped(scope),
                inner.reader_cache_key().scoped(scope),
            ),
            None => (inner.core_cache_key(), inner.reader_cache_key()),
        };
        Self {
            inner,
            state,
            core_key,
            reader_key,
        }
    }

    /// The wrapped reader.
    pub fn inner(&self) -> &Arc<dyn SegmentReader> {
        &self.inner
    }

    /// The derived filter state.
    pub fn state(&self) -> &FilteredState {
        &self.state
    }
}

impl SegmentReader for FilteredSegmentView {
    fn segment_id(&self) -> SegmentId {
        self.inner.segment_id()
    }

    fn index_name(&self) -> &str {
        self.inner.index_name()
    }

    fn max_doc(&self) -> u32 {
        self.inner.max_doc()
    }

    fn num_docs(&self) -> u32 {
        self.state.num_docs
    }

    fn live_docs(&self) -> Option<&FixedBitSet> {
        match &self.state.live_docs {
            Some(live) => Some(live),
            None => self.inner.live_docs(),
        }
    }

    fn field_schema(&self) -> &FieldSchema {
        &self.state.schema
    }

    fn stored_fields(&self, doc: DocId) -> Result<Vec<(String, Value)>> {
        self.inner.stored_fields(doc)
    }

    fn postings(&self, field: &str, term: &str) -> Option<&[DocId]> {
        self.inner.postings(field, term)
    }

    fn terms(&self, field: &str) -> Vec<&str> {
        self.inner.terms(field)
    }

    fn core_cache_key(&self) -> CacheKey {
        self.core_key
    }

    fn reader_cache_key(&self) -> CacheKey {
        self.reader_key
    }
}

/// A snapshot whose segments are all seen through one security context.
pub struct FilteredIndexView {
    inner: Arc<dyn IndexReader>,
    plan: Arc<WrapPlan>,
    segments: Vec<Arc<dyn SegmentReader>>,
    cache_key: CacheKey,
}

impl FilteredIndexView {
    /// Wrap every segment of `inner` according to `plan`.
    pub fn new(inner: Arc<dyn IndexReader>, plan: Arc<WrapPlan>) -> SecurityResult<Self> {
        let segments = inner
            .segments()
            .iter()
            .map(|segment| plan.wrap_segment(segment))
            .collect::<SecurityResult<Vec<_>>>()?;

        let cache_key = match plan.cache_scope() {
            Some(scope) => inner.reader_cache_key().scoped(scope),
            None => inner.reader_cache_key(),
        };

        Ok(Self {
            inner,
            plan,
            segments,
            cache_key,
        })
    }

    /// Build views over a newer snapshot, bound to the same context.
    pub fn reopen(&self, snapshot: Arc<dyn IndexReader>) -> SecurityResult<Self> {
        Self::new(snapshot, Arc::clone(&self.plan))
    }

    /// The wrapped snapshot.
    pub fn inner(&self) -> &Arc<dyn IndexReader> {
        &self.inner
    }

    /// The plan every segment was wrapped with.
    pub fn plan(&self) -> &Arc<WrapPlan> {
        &self.plan
    }
}

impl IndexReader for FilteredIndexView {
    fn index_name(&self) -> &str {
        self.inner.index_name()
    }

    fn generation(&self) -> u64 {
        self.inner.generation()
    }

    fn segments(&self) -> &[Arc<dyn SegmentReader>] {
        &self.segments
    }

    fn reader_cache_key(&self) -> CacheKey {
        self.cache_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::segment_filter::SegmentFilter;
    use crate::segment::{MemorySegment, SegmentId};

    fn segment() -> Arc<dyn SegmentReader> {
        let mut builder = MemorySegment::builder("a", SegmentId(0));
        builder.add(vec![("title", "a1".into()), ("secret", "s".into())]);
        builder.add(vec![("title", "a2".into()), ("secret", "t".into())]);
        Arc::new(builder.build())
    }

    fn state(live: &[DocId], fields: &[&str], segment: &Arc<dyn SegmentReader>) -> FilteredState {
        let mut bits = FixedBitSet::new(segment.max_doc() as usize);
        bits.or_iter(live.iter().copied());
        FilteredState {
            num_docs: bits.cardinality() as u32,
            live_docs: Some(bits),
            schema: segment.field_schema().retain(|f| fields.contains(&f.name.as_str())),
        }
    }

    #[test]
    fn test_view_overrides_liveness_and_schema() {
        let inner = segment();
        let view = FilteredSegmentView::new(Arc::clone(&inner), state(&[0], &["title"], &inner), None);

        assert_eq!(view.num_docs(), 1);
        assert_eq!(view.max_doc(), 2);
        assert!(view.is_live(0));
        assert!(!view.is_live(1));
        assert_eq!(view.field_schema().names(), vec!["title"]);
        assert_eq!(view.postings("title", "a2"), Some(&[1][..]));
        assert_eq!(view.stored_fields(1).unwrap().len(), 2);
    }

    #[test]
    fn test_delegated_liveness() {
        let inner = segment();
        let unfiltered = SegmentFilter::apply(inner.as_ref(), None, None).unwrap();
        let view = FilteredSegmentView::new(Arc::clone(&inner), unfiltered, None);
        assert!(view.live_docs().is_none());
        assert_eq!(view.num_docs(), 2);
    }

    #[test]
    fn test_cache_keys() {
        let inner = segment();
        let passthrough = FilteredSegmentView::new(Arc::clone(&inner), state(&[0], &["title"], &inner), None);
        assert_eq!(passthrough.reader_cache_key(), inner.reader_cache_key());

        let a = FilteredSegmentView::new(Arc::clone(&inner), state(&[0], &["title"], &inner), Some([1; 32]));
        let b = FilteredSegmentView::new(Arc::clone(&inner), state(&[1], &["title"], &inner), Some([2; 32]));
        assert_ne!(a.reader_cache_key(), inner.reader_cache_key());
        assert_ne!(a.reader_cache_key(), b.reader_cache_key());
        assert_ne!(a.core_cache_key(), b.core_cache_key());
        assert_eq!(a.core_cache_key().id(), inner.core_cache_key().id());
    }
}
