//! Wrapping of segments and snapshots as they are opened for a request.
//!
//! Each wrap walks the same steps:
//!
//! 1. **Disabled**: filtering is off for the index, return the reader as is.
//! 2. **ResolveContext**: decode the request's token. A missing token is
//!    handled by the configured [`AbsentContextPolicy`].
//! 3. **EmptyPredicate**: a blank row predicate filters no rows. When no
//!    field spec applies either, the reader is returned as is.
//! 4. **CompilePredicate**: compile the predicate against the segment.
//! 5. **ApplyFilter**: compute the filtered state and wrap the reader.
//!
//! Steps 1 and 2 happen once per request in [`WrapOrchestrator::plan`];
//! steps 3 to 5 happen per segment in [`WrapPlan::wrap_segment`].

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use super::codec::SecurityContextCodec;
use super::config::{AbsentContextPolicy, CacheKeyMode, IndexSettings, SecurityConfig};
use super::context::SecurityContext;
use super::error::{SecurityError, SecurityResult};
use super::field_spec::FieldVisibilitySpec;
use super::matcher::{JsonPredicateCompiler, PredicateCompiler};
use super::propagation::RequestContext;
use super::segment_filter::SegmentFilter;
use super::view::{FilteredIndexView, FilteredSegmentView};
use crate::segment::{IndexReader, SegmentReader};

/// Wraps readers of one index for the requests that open them.
///
/// The orchestrator holds only configuration; it keeps no per-request state
/// and can be shared across threads.
pub struct WrapOrchestrator {
    index: String,
    config: SecurityConfig,
    fields: Option<FieldVisibilitySpec>,
    compiler: Arc<dyn PredicateCompiler>,
}

impl WrapOrchestrator {
    /// Create an orchestrator for `index` using the JSON predicate compiler.
    pub fn new(index: impl Into<String>, settings: &IndexSettings) -> Self {
        let index = index.into();
        if !settings.security.enabled {
            warn!(index = %index, "document and field filtering disabled");
        }
        Self {
            index,
            config: settings.security.clone(),
            fields: settings.fields.clone().filter(|spec| !spec.is_empty()),
            compiler: Arc::new(JsonPredicateCompiler::new()),
        }
    }

    /// Use a different predicate compiler.
    pub fn with_compiler(mut self, compiler: Arc<dyn PredicateCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    /// Index this orchestrator protects.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Active configuration.
    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Resolve the request's context.
    ///
    /// Returns `None` when readers are to be served unwrapped.
    pub fn plan(&self, request: &RequestContext) -> SecurityResult<Option<Arc<WrapPlan>>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let context = match SecurityContextCodec::decode(request.security_token())? {
            Some(context) => context,
            None => match self.config.absent_context {
                AbsentContextPolicy::FailOpen => {
                    warn!(
                        index = %self.index,
                        request = request.id(),
                        "no security context found, serving unfiltered"
                    );
                    return Ok(None);
                }
                AbsentContextPolicy::FailClosed => {
                    return Err(SecurityError::ContextMissing {
                        index: self.index.clone(),
                    })
                }
            },
        };

        if context.is_unrestricted() && self.fields.is_none() {
            debug!(index = %self.index, request = request.id(), "empty predicate, bypassing filter");
            return Ok(None);
        }

        let cache_scope = match self.config.cache_key_mode {
            CacheKeyMode::Composite => Some(context.fingerprint()),
            CacheKeyMode::Passthrough => None,
        };

        Ok(Some(Arc::new(WrapPlan {
            context,
            index_fields: self.fields.clone(),
            compiler: Arc::clone(&self.compiler),
            cache_scope,
        })))
    }

    /// Wrap one segment for `request`.
    #[instrument(skip_all, fields(index = %self.index, segment = %segment.segment_id(), request = request.id()))]
    pub fn wrap_segment(
        &self,
        request: &RequestContext,
        segment: Arc<dyn SegmentReader>,
    ) -> SecurityResult<Arc<dyn SegmentReader>> {
        match self.plan(request)? {
            Some(plan) => plan.wrap_segment(&segment),
            None => Ok(segment),
        }
    }

    /// Wrap a whole snapshot for `request`.
    #[instrument(skip_all, fields(index = %self.index, generation = snapshot.generation(), request = request.id()))]
    pub fn wrap_index(
        &self,
        request: &RequestContext,
        snapshot: Arc<dyn IndexReader>,
    ) -> SecurityResult<Arc<dyn IndexReader>> {
        match self.plan(request)? {
            Some(plan) => Ok(Arc::new(FilteredIndexView::new(snapshot, plan)?)),
            None => Ok(snapshot),
        }
    }
}

/// A resolved security context ready to be applied to segments.
pub struct WrapPlan {
    context: SecurityContext,
    index_fields: Option<FieldVisibilitySpec>,
    compiler: Arc<dyn PredicateCompiler>,
    cache_scope: Option<[u8; 32]>,
}

impl WrapPlan {
    /// The resolved request context.
    pub fn context(&self) -> &SecurityContext {
        &self.context
    }

    /// Scope applied to cache keys of wrapped readers, if any.
    pub fn cache_scope(&self) -> Option<[u8; 32]> {
        self.cache_scope
    }

    /// Wrap `segment`.
    ///
    /// The visible fields are the index's configured fields, narrowed again
    /// by the request's field spec when it carries one.
    pub fn wrap_segment(&self, segment: &Arc<dyn SegmentReader>) -> SecurityResult<Arc<dyn SegmentReader>> {
        let matcher = match self.context.effective_predicate() {
            Some(predicate) => Some(self.compiler.compile(predicate, segment)?),
            None => None,
        };

        let mut state = SegmentFilter::apply(segment.as_ref(), matcher.as_deref(), self.index_fields.as_ref())?;
        if let Some(spec) = self.context.effective_field_spec() {
            state = state.restrict_fields(spec);
        }

        Ok(Arc::new(FilteredSegmentView::new(
            Arc::clone(segment),
            state,
            self.cache_scope,
        )))
    }
}
