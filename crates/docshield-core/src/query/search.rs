//! Search execution over index readers.
//!
//! The searcher only ever consults a reader's liveness and visible schema,
//! so running it over a filtered view yields exactly what the view permits:
//! hidden documents are skipped, and every hit is projected onto the
//! segment's visible fields before the query filter is evaluated. A clause on
//! a hidden field therefore behaves as if the field did not exist.

use std::collections::BTreeSet;

use docshield_proto::{FilterExpr, Value};
use serde::Serialize;
use tracing::trace;

use super::filter::FilterEvaluator;
use crate::error::Result;
use crate::segment::{DocId, IndexReader, SegmentId, SegmentReader};

/// A search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchQuery {
    /// Documents must match this filter. `None` matches every document.
    pub filter: Option<FilterExpr>,
    /// Maximum number of hits returned. The total is always exact.
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Match every visible document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match documents satisfying `filter`.
    pub fn filtered(filter: FilterExpr) -> Self {
        Self {
            filter: Some(filter),
            limit: None,
        }
    }

    /// Cap the number of hits.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One matching document.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Segment holding the document.
    pub segment: SegmentId,
    /// Document id within the segment.
    pub doc: DocId,
    /// Visible stored fields.
    pub fields: Vec<(String, Value)>,
}

impl SearchHit {
    /// Value of a visible field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    /// Index searched.
    pub index: String,
    /// Snapshot generation searched.
    pub generation: u64,
    /// Number of matching documents.
    pub total: u64,
    /// Matching documents in segment and document order, up to the limit.
    pub hits: Vec<SearchHit>,
}

impl SearchResponse {
    /// Values of `field` across hits, skipping hits without it.
    pub fn values_of(&self, field: &str) -> Vec<&Value> {
        self.hits.iter().filter_map(|hit| hit.get(field)).collect()
    }
}

/// Executes queries against any [`IndexReader`].
pub struct Searcher;

impl Searcher {
    /// Run `query` over `reader`.
    pub fn search(reader: &dyn IndexReader, query: &SearchQuery) -> Result<SearchResponse> {
        let limit = query.limit.unwrap_or(usize::MAX);
        let mut total = 0u64;
        let mut hits = Vec::new();

        for segment in reader.segments() {
            Self::visit_matches(segment.as_ref(), query.filter.as_ref(), |doc, fields| {
                total += 1;
                if hits.len() < limit {
                    hits.push(SearchHit {
                        segment: segment.segment_id(),
                        doc,
                        fields,
                    });
                }
            })?;
        }

        trace!(index = %reader.index_name(), total, returned = hits.len(), "search complete");

        Ok(SearchResponse {
            index: reader.index_name().to_string(),
            generation: reader.generation(),
            total,
            hits,
        })
    }

    /// Count documents matching `filter`.
    pub fn count(reader: &dyn IndexReader, filter: Option<&FilterExpr>) -> Result<u64> {
        let filter = match filter {
            Some(filter) => filter,
            None => return Ok(reader.num_docs()),
        };

        let mut total = 0u64;
        for segment in reader.segments() {
            Self::visit_matches(segment.as_ref(), Some(filter), |_, _| total += 1)?;
        }
        Ok(total)
    }

    /// Names of every field visible in at least one segment, sorted.
    pub fn field_names(reader: &dyn IndexReader) -> Vec<String> {
        let names: BTreeSet<&str> = reader
            .segments()
            .iter()
            .flat_map(|segment| segment.field_schema().iter().map(|f| f.name.as_str()))
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    fn visit_matches<F>(segment: &dyn SegmentReader, filter: Option<&FilterExpr>, mut visit: F) -> Result<()>
    where
        F: FnMut(DocId, Vec<(String, Value)>),
    {
        let schema = segment.field_schema();
        let docs: Box<dyn Iterator<Item = DocId> + '_> = match segment.live_docs() {
            Some(live) => Box::new(live.iter_ones().filter(|&d| d < segment.max_doc())),
            None => Box::new(0..segment.max_doc()),
        };

        for doc in docs {
            let mut fields = segment.stored_fields(doc)?;
            fields.retain(|(name, _)| schema.contains(name));

            if filter.map_or(true, |f| FilterEvaluator::evaluate(f, &fields)) {
                visit(doc, fields);
            }
        }
        Ok(())
    }
}
