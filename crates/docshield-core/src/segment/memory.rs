//! In-memory immutable segments.
//!
//! A [`MemorySegment`] is split into a shared core (documents, term
//! dictionary, schema) and per-reader liveness. Applying deletions yields a
//! new reader over the same core, so the core cache key is stable across
//! deletions while the reader cache key changes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use docshield_proto::Value;
use tracing::debug;

use super::bitset::FixedBitSet;
use super::reader::{CacheKey, SegmentId, SegmentReader};
use super::schema::{FieldInfo, FieldSchema};
use super::DocId;
use crate::error::{Error, Result};

type Row = Vec<(String, Value)>;

#[derive(Debug)]
struct SegmentCore {
    id: SegmentId,
    index: String,
    schema: FieldSchema,
    documents: Vec<Row>,
    /// field -> term -> sorted doc ids
    postings: HashMap<String, BTreeMap<String, Vec<DocId>>>,
    cache_key: CacheKey,
}

/// An immutable in-memory segment.
#[derive(Debug, Clone)]
pub struct MemorySegment {
    core: Arc<SegmentCore>,
    live_docs: Option<Arc<FixedBitSet>>,
    num_docs: u32,
    reader_key: CacheKey,
}

impl MemorySegment {
    /// Start building a segment for `index`.
    pub fn builder(index: impl Into<String>, id: SegmentId) -> MemorySegmentBuilder {
        MemorySegmentBuilder::new(index, id)
    }

    /// Return a reader with `docs` additionally deleted.
    ///
    /// Ids that are already deleted or out of range are ignored. When
    /// nothing changes, the returned reader keeps this reader's cache key.
    pub fn with_deletions(&self, docs: impl IntoIterator<Item = DocId>) -> MemorySegment {
        let max_doc = self.max_doc();
        let mut live = match &self.live_docs {
            Some(live) => (**live).clone(),
            None => FixedBitSet::full(max_doc as usize),
        };

        let mut deleted = 0u32;
        for doc in docs {
            if doc < max_doc && live.get(doc) {
                live.clear(doc);
                deleted += 1;
            }
        }

        if deleted == 0 {
            return self.clone();
        }

        debug!(
            index = %self.core.index,
            segment = %self.core.id,
            deleted,
            "applied deletions"
        );

        Self {
            core: Arc::clone(&self.core),
            num_docs: live.cardinality() as u32,
            live_docs: Some(Arc::new(live)),
            reader_key: CacheKey::unique(),
        }
    }

    /// Iterate live document ids in ascending order.
    pub fn live_doc_ids(&self) -> Box<dyn Iterator<Item = DocId> + '_> {
        match &self.live_docs {
            Some(live) => Box::new(live.iter_ones()),
            None => Box::new(0..self.max_doc()),
        }
    }
}

impl SegmentReader for MemorySegment {
    fn segment_id(&self) -> SegmentId {
        self.core.id
    }

    fn index_name(&self) -> &str {
        &self.core.index
    }

    fn max_doc(&self) -> u32 {
        self.core.documents.len() as u32
    }

    fn num_docs(&self) -> u32 {
        self.num_docs
    }

    fn live_docs(&self) -> Option<&FixedBitSet> {
        self.live_docs.as_deref()
    }

    fn field_schema(&self) -> &FieldSchema {
        &self.core.schema
    }

    fn stored_fields(&self, doc: DocId) -> Result<Vec<(String, Value)>> {
        self.core
            .documents
            .get(doc as usize)
            .cloned()
            .ok_or(Error::DocOutOfRange {
                segment: self.core.id.0,
                doc,
                max_doc: self.max_doc(),
            })
    }

    fn postings(&self, field: &str, term: &str) -> Option<&[DocId]> {
        self.core
            .postings
            .get(field)
            .and_then(|terms| terms.get(term))
            .map(Vec::as_slice)
    }

    fn terms(&self, field: &str) -> Vec<&str> {
        self.core
            .postings
            .get(field)
            .map(|terms| terms.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn core_cache_key(&self) -> CacheKey {
        self.core.cache_key
    }

    fn reader_cache_key(&self) -> CacheKey {
        self.reader_key
    }
}

/// Builder assigning dense document ids in insertion order.
pub struct MemorySegmentBuilder {
    id: SegmentId,
    index: String,
    fields: Vec<String>,
    documents: Vec<Row>,
}

impl MemorySegmentBuilder {
    /// Create a builder for segment `id` of `index`.
    pub fn new(index: impl Into<String>, id: SegmentId) -> Self {
        Self {
            id,
            index: index.into(),
            fields: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Add a document and return its id.
    pub fn add_document(&mut self, fields: Vec<(String, Value)>) -> DocId {
        for (name, _) in &fields {
            if !self.fields.contains(name) {
                self.fields.push(name.clone());
            }
        }
        self.documents.push(fields);
        (self.documents.len() - 1) as DocId
    }

    /// Add a document from borrowed field names.
    pub fn add(&mut self, fields: Vec<(&str, Value)>) -> DocId {
        self.add_document(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    /// Number of documents added so far.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Check if no documents were added.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Freeze the segment.
    pub fn build(self) -> MemorySegment {
        let schema = FieldSchema::new(
            self.fields
                .iter()
                .enumerate()
                .map(|(number, name)| FieldInfo::new(name.clone(), number as u32)),
        );

        let mut postings: HashMap<String, BTreeMap<String, Vec<DocId>>> = HashMap::new();
        let mut documents = Vec::with_capacity(self.documents.len());

        for (doc, mut row) in self.documents.into_iter().enumerate() {
            row.sort_by_key(|(name, _)| schema.field(name).map(|f| f.number));
            for (name, value) in &row {
                for term in value.terms() {
                    let docs = postings
                        .entry(name.clone())
                        .or_default()
                        .entry(term.to_string())
                        .or_default();
                    if docs.last() != Some(&(doc as DocId)) {
                        docs.push(doc as DocId);
                    }
                }
            }
            documents.push(row);
        }

        let num_docs = documents.len() as u32;
        MemorySegment {
            core: Arc::new(SegmentCore {
                id: self.id,
                index: self.index,
                schema,
                documents,
                postings,
                cache_key: CacheKey::unique(),
            }),
            live_docs: None,
            num_docs,
            reader_key: CacheKey::unique(),
        }
    }
}
