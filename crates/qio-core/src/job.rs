//! Job metadata types.
//!
//! The remote service drives the job state machine; the client only observes
//! it by polling:
//!
//! ```text
//!   submit ──→ Waiting ──→ Executing ──→ Succeeded
//!                 │            │
//!                 │            ├──→ Failed
//!                 │            │
//!                 └────────────┴──→ Cancelled
//! ```
//!
//! Status names are opaque strings owned by the service. Only `Succeeded`,
//! `Failed` and `Cancelled` are terminal; anything the client does not know
//! is kept verbatim in [`JobStatus::Other`] and treated as still pending.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a remote job, as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    /// Job is queued.
    #[default]
    Waiting,
    /// Job is running on the target.
    Executing,
    /// Job finished and produced output.
    Succeeded,
    /// Job finished with an error.
    Failed,
    /// Job was cancelled.
    Cancelled,
    /// Any status name this client does not know about.
    Other(String),
}

impl JobStatus {
    /// The status name exactly as the service spells it.
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Waiting => "Waiting",
            JobStatus::Executing => "Executing",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Other(name) => name,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Check if the job finished successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Waiting" => JobStatus::Waiting,
            "Executing" => JobStatus::Executing,
            "Succeeded" => JobStatus::Succeeded,
            "Failed" => JobStatus::Failed,
            "Cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Other(s),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        JobStatus::from(s.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload attached to a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorData {
    /// Create a new error payload.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Input format tag for serialized optimization problems.
pub const QIO_INPUT_FORMAT: &str = "microsoft.qio.v2";

/// Output format tag for optimization results.
pub const QIO_OUTPUT_FORMAT: &str = "microsoft.qio-results.v2";

/// Snapshot of the service's view of a job.
///
/// Field names follow the service's camelCase JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    /// Job identifier.
    pub id: JobId,
    /// Friendly name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Container the service writes job artifacts to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_uri: Option<String>,
    /// Location of the uploaded problem.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data_uri: Option<String>,
    /// Input format tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_data_format: Option<String>,
    /// Solver parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_params: Option<serde_json::Value>,
    /// Provider that runs the job (e.g. "Microsoft").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    /// Solver target (e.g. "microsoft.paralleltempering-parameterfree.cpu").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Output format tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data_format: Option<String>,
    /// Current status.
    #[serde(default)]
    pub status: JobStatus,
    /// Error payload for failed jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_data: Option<ErrorData>,
    /// Location of the result blob, with or without a SAS token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_data_uri: Option<String>,
    /// Time the job was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    /// Time the job started executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_execution_time: Option<DateTime<Utc>>,
    /// Time the job finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_execution_time: Option<DateTime<Utc>>,
}

impl JobDetails {
    /// Create details carrying only an identifier.
    pub fn new(id: impl Into<JobId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Build a submission request for an uploaded optimization problem.
    pub fn for_problem(
        id: impl Into<JobId>,
        name: impl Into<String>,
        input_data_uri: impl Into<String>,
        provider_id: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            input_data_uri: Some(input_data_uri.into()),
            input_data_format: Some(QIO_INPUT_FORMAT.to_string()),
            provider_id: Some(provider_id.into()),
            target: Some(target.into()),
            output_data_format: Some(QIO_OUTPUT_FORMAT.to_string()),
            ..Self::default()
        }
    }

    /// Set the container URI.
    pub fn with_container_uri(mut self, uri: impl Into<String>) -> Self {
        self.container_uri = Some(uri.into());
        self
    }

    /// Set solver parameters.
    pub fn with_input_params(mut self, params: serde_json::Value) -> Self {
        self.input_params = Some(params);
        self
    }

    /// Update the status.
    pub fn with_status(mut self, status: impl Into<JobStatus>) -> Self {
        self.status = status.into();
        self
    }

    /// Set the error payload.
    pub fn with_error(mut self, error: ErrorData) -> Self {
        self.error_data = Some(error);
        self
    }

    /// Set the output data URI.
    pub fn with_output_data_uri(mut self, uri: impl Into<String>) -> Self {
        self.output_data_uri = Some(uri.into());
        self
    }
}
