//! Error types for the Azure adapter.

use qio_core::CoreError;
use thiserror::Error;

/// Result type for Azure operations.
pub type AzureResult<T> = Result<T, AzureError>;

/// Errors that can occur when talking to Azure Quantum or Azure Storage.
#[derive(Debug, Error)]
pub enum AzureError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Job, container or blob not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// API error response.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// A required setting is absent.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// A setting is present but unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// SAS token could not be signed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Downloaded body could not be decompressed.
    #[error("Decompression error: {0}")]
    Decompression(#[source] std::io::Error),

    /// Error reported by the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl AzureError {
    /// Convert into a core error, classifying the remaining cases with `other`.
    fn into_core(self, other: fn(String) -> CoreError) -> CoreError {
        match self {
            AzureError::AuthFailed(msg) => CoreError::Auth(msg),
            AzureError::NotFound(id) => CoreError::JobNotFound(id),
            AzureError::MissingConfig(_) | AzureError::InvalidConfig(_) => {
                CoreError::Validation(self.to_string())
            }
            AzureError::Json(e) => CoreError::Serialization(e),
            AzureError::Core(e) => e,
            other_error => other(other_error.to_string()),
        }
    }

    /// Convert a blob transfer failure into a core error.
    pub fn into_storage_error(self) -> CoreError {
        match self {
            AzureError::NotFound(what) => CoreError::Storage(format!("Not found: {what}")),
            e => e.into_core(CoreError::Storage),
        }
    }
}

impl From<AzureError> for CoreError {
    fn from(e: AzureError) -> Self {
        e.into_core(CoreError::Workspace)
    }
}
