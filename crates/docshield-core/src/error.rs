//! Core error types.

use thiserror::Error;

/// Core segment and query errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] docshield_proto::Error),

    /// Document id outside `0..max_doc`.
    #[error("document {doc} out of range for segment {segment} (max_doc {max_doc})")]
    DocOutOfRange {
        /// Segment that was read.
        segment: u64,
        /// Requested document id.
        doc: u32,
        /// Segment size.
        max_doc: u32,
    },

    /// Stored field data could not be read.
    #[error("stored fields unavailable: {0}")]
    StoredFields(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
