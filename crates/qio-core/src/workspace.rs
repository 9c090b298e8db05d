//! Control-plane collaborator.
//!
//! A [`Workspace`] is the client's view of one service workspace: it looks up
//! jobs, mints SAS URIs for the storage account linked to the workspace, and
//! optionally names a caller-managed storage account to use instead.
//!
//! | Method | Kind | Required |
//! |--------|------|----------|
//! | `storage()` | sync | yes |
//! | `get_job()` | async | yes |
//! | `linked_storage_sas_uri()` | async | yes |
//! | `submit_job()` | async | provided (unsupported) |
//! | `cancel_job()` | async | provided (unsupported) |

use async_trait::async_trait;

use crate::error::{CoreError, CoreResult};
use crate::job::{JobDetails, JobId};

/// Interface to a remote optimization workspace.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Connection string of a caller-managed storage account, if one is
    /// configured. `None` means the workspace's linked storage is used.
    fn storage(&self) -> Option<&str>;

    /// Fetch the current details of a job.
    async fn get_job(&self, job_id: &JobId) -> CoreResult<JobDetails>;

    /// Mint a SAS-secured URI for a container in the linked storage account,
    /// or for one blob in it when `blob_name` is given.
    async fn linked_storage_sas_uri(
        &self,
        container_name: &str,
        blob_name: Option<&str>,
    ) -> CoreResult<String>;

    /// Create a job from a submission request.
    async fn submit_job(&self, details: &JobDetails) -> CoreResult<JobDetails> {
        Err(CoreError::Unsupported(format!(
            "submit_job ({})",
            details.id
        )))
    }

    /// Request cancellation of a job.
    async fn cancel_job(&self, job_id: &JobId) -> CoreResult<JobDetails> {
        Err(CoreError::Unsupported(format!("cancel_job ({job_id})")))
    }
}
