//! DocShield - per-request document and field level security for search.
//!
//! DocShield restricts what each request can read from an index without
//! touching the index itself. An authorization layer resolves what a caller
//! may see into a [`SecurityContext`], attaches it to the caller's
//! [`RequestContext`], and every read through the [`Node`] is served from
//! filtered views of the index's segments.
//!
//! # Quick Start
//!
//! ```ignore
//! use docshield::{FieldVisibilitySpec, IndexSettings, Node, RequestContext, SearchQuery, SecurityContext};
//! use docshield::proto::FilterExpr;
//!
//! let node = Node::default();
//! node.create_index("a", IndexSettings::protected())?;
//! node.index("a", vec![("title", "a1".into())])?;
//! node.index("a", vec![("title", "a2".into())])?;
//! node.refresh("a")?;
//!
//! // Resolved by the authorization layer for this caller
//! let context = SecurityContext::with_predicate(FilterExpr::eq("title", "a1").to_json()?);
//! let request = RequestContext::with_security_context(&context)?;
//!
//! let response = node.search(&request, "a", &SearchQuery::all())?;
//! assert_eq!(response.total, 1);
//! ```

pub mod config;
pub mod error;
pub mod node;

pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::Node;

pub use docshield_core::query::{SearchHit, SearchQuery, SearchResponse};
pub use docshield_core::security::{
    AbsentContextPolicy, CacheKeyMode, FieldVisibilitySpec, IndexSettings, RequestContext, SecurityConfig,
    SecurityContext, SecurityError,
};

/// Re-export protocol types.
pub use docshield_proto as proto;
