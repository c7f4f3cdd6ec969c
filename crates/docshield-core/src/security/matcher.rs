//! Row predicate compilation.
//!
//! Predicate text is compiled once per segment into a [`PredicateMatcher`].
//! Matching is boolean only; nothing is scored.

use std::sync::Arc;

use docshield_proto::{FilterExpr, SimpleFilter, Value};
use tracing::trace;

use super::error::{SecurityError, SecurityResult};
use crate::query::FilterEvaluator;
use crate::segment::{DocId, SegmentReader};

/// Compiled row predicate bound to one segment.
pub trait PredicateMatcher: Send + Sync {
    /// Check whether `doc` satisfies the predicate.
    fn matches(&self, doc: DocId) -> SecurityResult<bool>;

    /// All ids in `0..max_doc` satisfying the predicate, ascending.
    ///
    /// Liveness is not considered here.
    fn matching_docs(&self, max_doc: DocId) -> SecurityResult<Vec<DocId>> {
        let mut docs = Vec::new();
        for doc in 0..max_doc {
            if self.matches(doc)? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }
}

/// Turns predicate text into a matcher for a given segment.
pub trait PredicateCompiler: Send + Sync {
    /// Compile `predicate` against `segment`.
    fn compile(
        &self,
        predicate: &str,
        segment: &Arc<dyn SegmentReader>,
    ) -> SecurityResult<Box<dyn PredicateMatcher>>;
}

/// Compiler for the JSON filter DSL.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPredicateCompiler;

impl JsonPredicateCompiler {
    /// Create a compiler.
    pub fn new() -> Self {
        Self
    }

    /// Collect `(field, term)` pairs when `filter` is a pure disjunction of
    /// string terms that the postings can answer exactly.
    fn term_disjunction(filter: &FilterExpr) -> Option<Vec<(&str, &str)>> {
        match filter {
            FilterExpr::Eq { field, value } => Some(vec![(field.as_str(), value.as_str()?)]),
            FilterExpr::In { field, values } => Self::string_terms(field, values),
            FilterExpr::Or(filters) => {
                let mut terms = Vec::new();
                for f in filters {
                    match f {
                        SimpleFilter::Eq { field, value } => terms.push((field.as_str(), value.as_str()?)),
                        SimpleFilter::In { field, values } => terms.extend(Self::string_terms(field, values)?),
                        _ => return None,
                    }
                }
                Some(terms)
            }
            _ => None,
        }
    }

    fn string_terms<'a>(field: &'a str, values: &'a [Value]) -> Option<Vec<(&'a str, &'a str)>> {
        values.iter().map(|v| v.as_str().map(|t| (field, t))).collect()
    }
}

impl PredicateCompiler for JsonPredicateCompiler {
    fn compile(
        &self,
        predicate: &str,
        segment: &Arc<dyn SegmentReader>,
    ) -> SecurityResult<Box<dyn PredicateMatcher>> {
        let filter = FilterExpr::from_json(predicate)
            .map_err(|e| SecurityError::PredicateCompile(e.to_string()))?;

        if let Some(terms) = Self::term_disjunction(&filter) {
            let mut docs: Vec<DocId> = terms
                .iter()
                .filter_map(|(field, term)| segment.postings(field, term))
                .flatten()
                .copied()
                .collect();
            docs.sort_unstable();
            docs.dedup();

            trace!(segment = %segment.segment_id(), terms = terms.len(), matched = docs.len(), "compiled term predicate");
            return Ok(Box::new(PostingsMatcher { docs }));
        }

        trace!(segment = %segment.segment_id(), "compiled stored-field predicate");
        Ok(Box::new(StoredFieldMatcher {
            segment: Arc::clone(segment),
            filter,
        }))
    }
}

/// Matcher backed by a precomputed posting list.
#[derive(Debug)]
struct PostingsMatcher {
    docs: Vec<DocId>,
}

impl PredicateMatcher for PostingsMatcher {
    fn matches(&self, doc: DocId) -> SecurityResult<bool> {
        Ok(self.docs.binary_search(&doc).is_ok())
    }

    fn matching_docs(&self, max_doc: DocId) -> SecurityResult<Vec<DocId>> {
        Ok(self.docs.iter().copied().take_while(|&d| d < max_doc).collect())
    }
}

/// Matcher evaluating the filter against stored fields.
#[derive(Debug)]
struct StoredFieldMatcher {
    segment: Arc<dyn SegmentReader>,
    filter: FilterExpr,
}

impl PredicateMatcher for StoredFieldMatcher {
    fn matches(&self, doc: DocId) -> SecurityResult<bool> {
        let row = self.segment.stored_fields(doc)?;
        Ok(FilterEvaluator::evaluate(&self.filter, &row))
    }
}
