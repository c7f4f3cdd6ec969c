//! Security-specific error types.

use thiserror::Error;

/// Errors raised while resolving a security context or building a filtered
/// view.
///
/// A wrap either succeeds completely or returns one of these; there is no
/// partially filtered result.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Missing collaborator or invalid settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A context token was present but could not be decoded.
    #[error("failed to decode security context: {0}")]
    ContextDecode(String),

    /// No context token was attached to a request for a protected index.
    #[error("security context missing for index '{index}'")]
    ContextMissing {
        /// Index that was being opened.
        index: String,
    },

    /// The row predicate could not be compiled.
    #[error("predicate compilation error: {0}")]
    PredicateCompile(String),

    /// Reading the segment failed while evaluating the predicate.
    #[error("segment access error: {0}")]
    SegmentAccess(#[from] crate::error::Error),

    /// The propagation channel was misused.
    #[error("invalid security context: {0}")]
    InvalidContext(String),
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SecurityError::ContextMissing {
            index: "orders".to_string(),
        };
        assert!(err.to_string().contains("'orders'"));

        let err = SecurityError::PredicateCompile("unexpected token".to_string());
        assert!(err.to_string().contains("unexpected token"));
    }

    #[test]
    fn test_from_core_error() {
        let core = crate::error::Error::StoredFields("truncated row".to_string());
        let err: SecurityError = core.into();
        assert!(matches!(err, SecurityError::SegmentAccess(_)));
        assert!(err.to_string().contains("truncated row"));
    }
}
