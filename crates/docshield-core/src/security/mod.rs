//! Document- and field-level security for segment readers.
//!
//! The authorization layer decides what a caller may see and expresses it as
//! a [`SecurityContext`]: a row predicate plus an optional field visibility
//! spec. The context is encoded into a token and attached to the caller's
//! [`RequestContext`]. When a segment or snapshot is opened for that request,
//! the index's [`WrapOrchestrator`] decodes the token, compiles the predicate
//! against each segment and returns filtered views. Everything downstream
//! (search, counting, field listing) reads through those views.
//!
//! # Example
//!
//! ```ignore
//! use docshield_core::security::{IndexSettings, RequestContext, SecurityContext, WrapOrchestrator};
//!
//! let orchestrator = WrapOrchestrator::new("orders", &IndexSettings::protected());
//!
//! let context = SecurityContext::with_predicate(r#"{"Eq":{"field":"owner","value":"alice"}}"#);
//! let request = RequestContext::with_security_context(&context)?;
//!
//! let reader = orchestrator.wrap_index(&request, index.snapshot())?;
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod field_spec;
pub mod matcher;
pub mod orchestrator;
pub mod propagation;
pub mod segment_filter;
pub mod view;

// Error types
pub use error::{SecurityError, SecurityResult};

// Context and propagation
pub use codec::SecurityContextCodec;
pub use context::SecurityContext;
pub use propagation::{RequestContext, SECURITY_CONTEXT_HEADER};

// Configuration
pub use config::{AbsentContextPolicy, CacheKeyMode, IndexSettings, SecurityConfig};

// Filtering
pub use field_spec::{FieldSelector, FieldVisibilitySpec};
pub use matcher::{JsonPredicateCompiler, PredicateCompiler, PredicateMatcher};
pub use orchestrator::{WrapOrchestrator, WrapPlan};
pub use segment_filter::{FilteredState, SegmentFilter};
pub use view::{FilteredIndexView, FilteredSegmentView};
