//! Point-in-time index snapshots and the in-memory index that publishes them.

use std::sync::Arc;

use docshield_proto::Value;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::memory::MemorySegment;
use super::reader::{CacheKey, SegmentId, SegmentReader};

/// Read access to every segment of one index generation.
pub trait IndexReader: Send + Sync {
    /// Name of the index.
    fn index_name(&self) -> &str;

    /// Generation this reader was opened at.
    fn generation(&self) -> u64;

    /// Segments in this generation.
    fn segments(&self) -> &[Arc<dyn SegmentReader>];

    /// Key identifying this reader for caches.
    fn reader_cache_key(&self) -> CacheKey;

    /// Total live documents across segments.
    fn num_docs(&self) -> u64 {
        self.segments().iter().map(|s| s.num_docs() as u64).sum()
    }

    /// Total document slots across segments.
    fn max_doc(&self) -> u64 {
        self.segments().iter().map(|s| s.max_doc() as u64).sum()
    }
}

/// Immutable set of segments published by an index at one generation.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    index: String,
    generation: u64,
    segments: Vec<Arc<dyn SegmentReader>>,
    cache_key: CacheKey,
}

impl IndexSnapshot {
    /// Create a snapshot over `segments`.
    pub fn new(index: impl Into<String>, generation: u64, segments: Vec<Arc<dyn SegmentReader>>) -> Self {
        Self {
            index: index.into(),
            generation,
            segments,
            cache_key: CacheKey::unique(),
        }
    }
}

impl IndexReader for IndexSnapshot {
    fn index_name(&self) -> &str {
        &self.index
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn segments(&self) -> &[Arc<dyn SegmentReader>] {
        &self.segments
    }

    fn reader_cache_key(&self) -> CacheKey {
        self.cache_key
    }
}

struct IndexState {
    pending: Vec<Vec<(String, Value)>>,
    segments: Vec<MemorySegment>,
    next_segment: u64,
    dirty: bool,
    published: Arc<IndexSnapshot>,
}

/// A writable in-memory index.
///
/// Writes are buffered until [`refresh`](Self::refresh), which freezes them
/// into a new segment and publishes a new snapshot generation. Readers keep
/// whatever snapshot they opened.
pub struct MemoryIndex {
    name: String,
    state: RwLock<IndexState>,
}

impl MemoryIndex {
    /// Create an empty index. Generation 0 has no segments.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let published = Arc::new(IndexSnapshot::new(name.clone(), 0, Vec::new()));
        Self {
            name,
            state: RwLock::new(IndexState {
                pending: Vec::new(),
                segments: Vec::new(),
                next_segment: 0,
                dirty: false,
                published,
            }),
        }
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Buffer a document for the next refresh.
    pub fn add_document(&self, fields: Vec<(String, Value)>) {
        let mut state = self.state.write();
        state.pending.push(fields);
        state.dirty = true;
    }

    /// Buffer a document from borrowed field names.
    pub fn add(&self, fields: Vec<(&str, Value)>) {
        self.add_document(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        );
    }

    /// Delete every document whose `field` contains `term`.
    ///
    /// Deletions become visible at the next refresh. Returns the number of
    /// documents deleted.
    pub fn delete_by_term(&self, field: &str, term: &str) -> usize {
        let mut state = self.state.write();
        let mut deleted = 0;

        for segment in state.segments.iter_mut() {
            let docs: Vec<_> = match segment.postings(field, term) {
                Some(docs) => docs.iter().copied().filter(|&d| segment.is_live(d)).collect(),
                None => continue,
            };
            if docs.is_empty() {
                continue;
            }
            deleted += docs.len();
            *segment = segment.with_deletions(docs);
        }

        let before = state.pending.len();
        state.pending.retain(|row| {
            !row.iter()
                .any(|(name, value)| name == field && value.terms().contains(&term))
        });
        deleted += before - state.pending.len();

        if deleted > 0 {
            state.dirty = true;
        }
        deleted
    }

    /// Freeze buffered writes and publish a new generation.
    ///
    /// Returns the current snapshot unchanged when there is nothing to
    /// publish.
    pub fn refresh(&self) -> Arc<IndexSnapshot> {
        let mut state = self.state.write();
        if !state.dirty {
            return Arc::clone(&state.published);
        }

        if !state.pending.is_empty() {
            let id = SegmentId(state.next_segment);
            state.next_segment += 1;

            let mut builder = MemorySegment::builder(self.name.clone(), id);
            for row in std::mem::take(&mut state.pending) {
                builder.add_document(row);
            }
            state.segments.push(builder.build());
        }

        self.publish(&mut state)
    }

    /// Rewrite every live document into a single segment and publish.
    pub fn force_merge(&self) -> Arc<IndexSnapshot> {
        let mut state = self.state.write();
        if state.segments.len() <= 1 && !state.segments.iter().any(|s| s.has_deletions()) {
            return Arc::clone(&state.published);
        }

        let id = SegmentId(state.next_segment);
        state.next_segment += 1;

        let mut builder = MemorySegment::builder(self.name.clone(), id);
        for segment in &state.segments {
            for doc in segment.live_doc_ids() {
                if let Ok(row) = segment.stored_fields(doc) {
                    builder.add_document(row);
                }
            }
        }

        let merged_from = state.segments.len();
        state.segments = if builder.is_empty() {
            Vec::new()
        } else {
            vec![builder.build()]
        };

        info!(index = %self.name, merged_from, "force merge complete");
        self.publish(&mut state)
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.state.read().published)
    }

    fn publish(&self, state: &mut IndexState) -> Arc<IndexSnapshot> {
        let generation = state.published.generation() + 1;
        let segments: Vec<Arc<dyn SegmentReader>> = state
            .segments
            .iter()
            .map(|s| Arc::new(s.clone()) as Arc<dyn SegmentReader>)
            .collect();

        let snapshot = Arc::new(IndexSnapshot::new(self.name.clone(), generation, segments));
        state.published = Arc::clone(&snapshot);
        state.dirty = false;

        debug!(
            index = %self.name,
            generation,
            segments = snapshot.segments().len(),
            num_docs = snapshot.num_docs(),
            "published snapshot"
        );
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: &str) -> Vec<(&str, Value)> {
        vec![("title", Value::from(title))]
    }

    #[test]
    fn test_refresh_publishes_generations() {
        let index = MemoryIndex::new("a");
        assert_eq!(index.snapshot().generation(), 0);

        index.add(titled("a1"));
        index.add(titled("a2"));
        assert_eq!(index.snapshot().num_docs(), 0);

        let first = index.refresh();
        assert_eq!(first.generation(), 1);
        assert_eq!(first.segments().len(), 1);
        assert_eq!(first.num_docs(), 2);

        let again = index.refresh();
        assert_eq!(again.generation(), 1);

        index.add(titled("a3"));
        let second = index.refresh();
        assert_eq!(second.generation(), 2);
        assert_eq!(second.segments().len(), 2);
        assert_eq!(first.num_docs(), 2);
    }

    #[test]
    fn test_delete_by_term() {
        let index = MemoryIndex::new("a");
        index.add(titled("a1"));
        index.add(titled("a2"));
        index.refresh();
        index.add(titled("a1"));

        assert_eq!(index.delete_by_term("title", "a1"), 2);
        let snapshot = index.refresh();
        assert_eq!(snapshot.num_docs(), 1);
        assert_eq!(snapshot.max_doc(), 2);
    }

    #[test]
    fn test_force_merge_drops_deleted() {
        let index = MemoryIndex::new("a");
        index.add(titled("a1"));
        index.refresh();
        index.add(titled("a2"));
        index.add(titled("a3"));
        index.refresh();
        index.delete_by_term("title", "a2");
        index.refresh();

        let merged = index.force_merge();
        assert_eq!(merged.segments().len(), 1);
        assert_eq!(merged.num_docs(), 2);
        assert_eq!(merged.max_doc(), 2);
        assert!(!merged.segments()[0].has_deletions());
    }

    #[test]
    fn test_snapshot_keys_are_distinct() {
        let index = MemoryIndex::new("a");
        index.add(titled("a1"));
        let first = index.refresh();
        index.add(titled("a2"));
        let second = index.refresh();
        assert_ne!(first.reader_cache_key(), second.reader_cache_key());
    }
}
