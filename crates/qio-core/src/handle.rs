//! Client-side handle to a remote job.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument};

use crate::error::{CoreError, CoreResult};
use crate::job::{JobDetails, JobId, JobStatus};
use crate::poll::{DotProgress, PollObserver, WaitOptions};
use crate::storage::{BlobStorage, BlobUri, has_sas_token};
use crate::workspace::Workspace;

/// Handle to a job running in a remote workspace.
///
/// The handle owns a snapshot of the job's details, replaced wholesale on
/// every [`refresh`](Job::refresh), and caches the decoded results after the
/// first successful download. Every method that talks to the service takes
/// `&mut self`; share a handle between tasks only behind a mutex.
pub struct Job {
    workspace: Arc<dyn Workspace>,
    storage: Arc<dyn BlobStorage>,
    id: JobId,
    details: JobDetails,
    results: Option<serde_json::Value>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("status", &self.details.status)
            .field("has_results", &self.results.is_some())
            .finish()
    }
}

impl Job {
    /// Wrap job details returned by the workspace.
    pub fn new(
        workspace: Arc<dyn Workspace>,
        storage: Arc<dyn BlobStorage>,
        details: JobDetails,
    ) -> Self {
        Self {
            workspace,
            storage,
            id: details.id.clone(),
            details,
            results: None,
        }
    }

    /// Look up an existing job by id.
    pub async fn fetch(
        workspace: Arc<dyn Workspace>,
        storage: Arc<dyn BlobStorage>,
        job_id: &JobId,
    ) -> CoreResult<Self> {
        let details = workspace.get_job(job_id).await?;
        Ok(Self::new(workspace, storage, details))
    }

    /// Job identifier.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Last observed details.
    pub fn details(&self) -> &JobDetails {
        &self.details
    }

    /// Last observed status.
    pub fn status(&self) -> &JobStatus {
        &self.details.status
    }

    /// Cached results, if they have been downloaded.
    pub fn results(&self) -> Option<&serde_json::Value> {
        self.results.as_ref()
    }

    /// Re-fetch the job's details from the workspace.
    #[instrument(skip(self), fields(job_id = %self.id))]
    pub async fn refresh(&mut self) -> CoreResult<()> {
        self.details = self.workspace.get_job(&self.id).await?;
        Ok(())
    }

    /// Whether the cached status is terminal. Never talks to the service.
    pub fn has_completed(&self) -> bool {
        self.details.status.is_terminal()
    }

    /// Request cancellation and store the details the service returns.
    pub async fn cancel(&mut self) -> CoreResult<()> {
        self.details = self.workspace.cancel_job(&self.id).await?;
        Ok(())
    }

    /// Poll until the job reaches a terminal status, printing a dot per poll.
    pub async fn wait_until_completed(&mut self, options: &WaitOptions) -> CoreResult<()> {
        let mut progress = DotProgress::stdout();
        self.wait_until_completed_with(options, &mut progress).await
    }

    /// Poll until the job reaches a terminal status, reporting each poll to
    /// `observer`.
    ///
    /// Refreshes once immediately, then sleeps according to
    /// [`WaitOptions::backoff`] between refreshes. Fails with
    /// [`CoreError::Timeout`] once `options.timeout` has elapsed. Dropping
    /// the future stops polling at the next await point.
    pub async fn wait_until_completed_with(
        &mut self,
        options: &WaitOptions,
        observer: &mut dyn PollObserver,
    ) -> CoreResult<()> {
        let started = Instant::now();
        let mut backoff = options.backoff();
        let mut polls = 0usize;

        self.refresh().await?;

        while !self.has_completed() {
            let mut wait = backoff.next().unwrap_or(options.max_poll_wait);

            if let Some(timeout) = options.timeout {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    observer.on_finish(&self.id, &self.details.status, polls);
                    return Err(CoreError::Timeout(self.id.to_string()));
                }
                wait = wait.min(timeout - elapsed);
            }

            debug!(
                "Waiting for job {}, it is in status '{}'",
                self.id, self.details.status
            );
            observer.on_poll(&self.id, &self.details.status, wait);
            polls += 1;

            sleep(wait).await;
            self.refresh().await?;
        }

        observer.on_finish(&self.id, &self.details.status, polls);
        Ok(())
    }

    /// Download and decode the job's output, waiting for completion first.
    ///
    /// The decoded payload is cached: later calls return it without any
    /// network traffic.
    pub async fn get_results(&mut self) -> CoreResult<&serde_json::Value> {
        let results = match self.results.take() {
            Some(cached) => cached,
            None => self.download_results().await?,
        };
        Ok(self.results.insert(results))
    }

    /// Like [`get_results`](Job::get_results), deserialized into `T`.
    pub async fn get_results_as<T: DeserializeOwned>(&mut self) -> CoreResult<T> {
        let results = self.get_results().await?;
        Ok(T::deserialize(results)?)
    }

    async fn download_results(&mut self) -> CoreResult<serde_json::Value> {
        if !self.has_completed() {
            self.wait_until_completed(&WaitOptions::default()).await?;
        }

        if !self.details.status.is_success() {
            return Err(CoreError::JobFailed {
                status: self.details.status.clone(),
                error_data: self.details.error_data.clone(),
            });
        }

        let output_uri = self
            .details
            .output_data_uri
            .as_deref()
            .ok_or_else(|| CoreError::MissingOutput(self.id.to_string()))?;

        let download_uri = if has_sas_token(output_uri)? {
            output_uri.to_string()
        } else {
            // Bare output URI: ask the service for a read SAS on that blob.
            let blob = BlobUri::parse(output_uri)?;
            self.workspace
                .linked_storage_sas_uri(blob.container_name(), Some(blob.blob_name()))
                .await?
        };

        let payload = self.storage.download_blob(&download_uri).await?;
        debug!("Downloaded {} bytes of results for job {}", payload.len(), self.id);

        Ok(serde_json::from_slice(&payload)?)
    }
}
