//! Error types for problem construction and upload.

use qio_core::CoreError;
use thiserror::Error;

/// Result type for problem operations.
pub type ProblemResult<T> = Result<T, ProblemError>;

/// Errors that can occur while building, encoding or uploading a problem.
#[derive(Debug, Error)]
pub enum ProblemError {
    /// Rejected term or problem input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Gzip compression failed.
    #[error("Compression error: {0}")]
    Compression(#[source] std::io::Error),

    /// A problem file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Workspace or storage failure during upload.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<ProblemError> for CoreError {
    fn from(e: ProblemError) -> Self {
        match e {
            ProblemError::Validation(msg) => CoreError::Validation(msg),
            ProblemError::Serialization(e) => CoreError::Serialization(e),
            ProblemError::Compression(e) | ProblemError::Io { source: e, .. } => CoreError::Io(e),
            ProblemError::Core(e) => e,
        }
    }
}
