//! Node error types.

use docshield_core::SecurityError;
use thiserror::Error;

/// Node errors.
#[derive(Debug, Error)]
pub enum Error {
    /// No index with this name exists.
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// An index with this name already exists.
    #[error("index already exists: {0}")]
    IndexExists(String),

    /// Security context resolution or filtering failed.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// Segment or query error.
    #[error(transparent)]
    Core(#[from] docshield_core::Error),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;
