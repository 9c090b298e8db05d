//! Error types for the core crate.

use thiserror::Error;

use crate::job::{ErrorData, JobStatus};

/// Errors that can occur while driving jobs and their storage.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// Input rejected at construction time.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Results were requested from a job that did not succeed.
    #[error(
        "Cannot retrieve results as job execution failed (status: {status}. error: {})",
        describe_error_data(.error_data)
    )]
    JobFailed {
        /// Terminal status reported by the service.
        status: JobStatus,
        /// Error payload reported by the service, if any.
        error_data: Option<ErrorData>,
    },

    /// Job not found.
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// A succeeded job carried no output location.
    #[error("Job {0} has no output data URI")]
    MissingOutput(String),

    /// Timeout waiting for job.
    #[error("Timeout waiting for job {0}")]
    Timeout(String),

    /// A blob or container URI could not be interpreted.
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A storage connection string could not be parsed.
    #[error("Invalid storage connection string: {0}")]
    InvalidConnectionString(String),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Blob storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Control-plane failure.
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// The collaborator does not implement the operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_error_data(error_data: &Option<ErrorData>) -> String {
    match error_data {
        Some(data) => data.to_string(),
        None => "None".to_string(),
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
