//! DocShield protocol types.
//!
//! This crate defines the types that cross the boundary between the
//! authorization layer that decides what a caller may see and the filtering
//! engine that enforces it.
//!
//! # Modules
//!
//! - [`value`] - Runtime values stored in documents and used in predicates
//! - [`query`] - The row-predicate DSL ([`FilterExpr`])
//! - [`error`] - Protocol error types
//!
//! # Predicate text
//!
//! Row predicates travel as JSON text. The authorization layer renders a
//! [`FilterExpr`] with [`FilterExpr::to_json`] and the engine parses it back
//! with [`FilterExpr::from_json`]:
//!
//! ```ignore
//! use docshield_proto::FilterExpr;
//!
//! let predicate = FilterExpr::eq("title", "a1").to_json()?;
//! assert_eq!(predicate, r#"{"Eq":{"field":"title","value":"a1"}}"#);
//! ```

pub mod error;
pub mod query;
pub mod value;

pub use error::Error;

pub use query::{FilterExpr, SimpleFilter};
pub use value::Value;

/// Version of the row-predicate DSL understood by this crate.
pub const PREDICATE_DSL_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dsl_version() {
        assert_eq!(PREDICATE_DSL_VERSION, 1);
    }

    #[test]
    fn test_predicate_json_shape() {
        let json = FilterExpr::eq("title", "a1").to_json().unwrap();
        assert_eq!(json, r#"{"Eq":{"field":"title","value":"a1"}}"#);
    }
}
