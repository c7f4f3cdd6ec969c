//! Computes the filtered liveness and schema of one segment.

use tracing::debug;

use super::error::SecurityResult;
use super::field_spec::FieldVisibilitySpec;
use super::matcher::PredicateMatcher;
use crate::segment::{FieldSchema, FixedBitSet, SegmentReader};

/// Derived state of a filtered segment.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredState {
    /// Filtered live documents. `None` means liveness is delegated to the
    /// underlying segment unchanged.
    pub live_docs: Option<FixedBitSet>,
    /// Number of documents visible through the filter.
    pub num_docs: u32,
    /// Visible fields.
    pub schema: FieldSchema,
}

impl FilteredState {
    /// Narrow the visible fields further with `spec`.
    pub fn restrict_fields(mut self, spec: &FieldVisibilitySpec) -> Self {
        self.schema = spec.project(&self.schema);
        self
    }

    /// Check if this state hides nothing of `segment`.
    pub fn is_identity(&self, segment: &dyn SegmentReader) -> bool {
        self.live_docs.is_none() && self.schema == *segment.field_schema()
    }
}

/// Applies a compiled predicate and a field spec to a segment.
pub struct SegmentFilter;

impl SegmentFilter {
    /// Compute the filtered state of `segment`.
    ///
    /// Without a matcher, liveness is delegated. With one, a document is
    /// visible only if it matches and is live in the segment. Without a field
    /// spec the schema is unchanged. The segment itself is never modified.
    pub fn apply(
        segment: &dyn SegmentReader,
        matcher: Option<&dyn PredicateMatcher>,
        field_spec: Option<&FieldVisibilitySpec>,
    ) -> SecurityResult<FilteredState> {
        let schema = match field_spec {
            Some(spec) => spec.project(segment.field_schema()),
            None => segment.field_schema().clone(),
        };

        let matcher = match matcher {
            Some(matcher) => matcher,
            None => {
                return Ok(FilteredState {
                    live_docs: None,
                    num_docs: segment.num_docs(),
                    schema,
                })
            }
        };

        let max_doc = segment.max_doc();
        let mut live = FixedBitSet::new(max_doc as usize);
        live.or_iter(
            matcher
                .matching_docs(max_doc)?
                .into_iter()
                .filter(|&doc| doc < max_doc),
        );
        let matched = live.cardinality();

        if let Some(original) = segment.live_docs() {
            live.and(original);
        }
        let num_docs = live.cardinality() as u32;

        debug!(
            index = %segment.index_name(),
            segment = %segment.segment_id(),
            max_doc,
            matched,
            num_docs,
            fields = schema.len(),
            "filtered segment"
        );

        Ok(FilteredState {
            live_docs: Some(live),
            num_docs,
            schema,
        })
    }
}
