//! Azure Quantum workspace REST client.
//!
//! All job and storage endpoints live under the workspace resource path:
//!
//! ```text
//! https://{location}.quantum.azure.com/v1.0/subscriptions/{subscription}
//!     /resourceGroups/{resource_group}/providers/Microsoft.Quantum/workspaces/{name}
//! ```
//!
//! | Operation | Request |
//! |-----------|---------|
//! | get job | `GET jobs/{id}` |
//! | submit job | `PUT jobs/{id}` with the job details as body |
//! | cancel job | `DELETE jobs/{id}`, then `GET jobs/{id}` |
//! | linked storage SAS | `POST storage/sasUri` with `{containerName, blobName?}` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qio_core::{CoreResult, JobDetails, JobId, TokenProvider, Workspace};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::WorkspaceConfig;
use crate::error::{AzureError, AzureResult};

/// API version path segment.
const API_PATH: &str = "/v1.0";

/// User agent sent with every request.
const USER_AGENT: &str = concat!("qio-adapter-azure/", env!("CARGO_PKG_VERSION"));

/// Base URL of the Azure Quantum data plane in `location`.
pub fn base_url_for_location(location: &str) -> String {
    format!(
        "https://{}.quantum.azure.com",
        location.to_ascii_lowercase().replace(' ', "")
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SasUriRequest<'a> {
    container_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    blob_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SasUriResponse {
    sas_uri: String,
}

/// Client for one Azure Quantum workspace.
#[derive(Clone)]
pub struct AzureWorkspace {
    client: Client,
    base_url: String,
    subscription_id: String,
    resource_group: String,
    name: String,
    storage: Option<String>,
    token_provider: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for AzureWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureWorkspace")
            .field("base_url", &self.base_url)
            .field("subscription_id", &self.subscription_id)
            .field("resource_group", &self.resource_group)
            .field("name", &self.name)
            .field("storage", &self.storage.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl AzureWorkspace {
    /// Create a client for the workspace `name` hosted in `location`.
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
        location: &str,
        token_provider: Arc<dyn TokenProvider>,
    ) -> AzureResult<Self> {
        let subscription_id = subscription_id.into();
        let resource_group = resource_group.into();
        let name = name.into();

        for (field, value) in [
            ("subscription_id", &subscription_id),
            ("resource_group", &resource_group),
            ("workspace name", &name),
        ] {
            if value.is_empty() {
                return Err(AzureError::MissingConfig(field.to_string()));
            }
        }
        if location.trim().is_empty() {
            return Err(AzureError::MissingConfig("location".to_string()));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url_for_location(location),
            subscription_id,
            resource_group,
            name,
            storage: None,
            token_provider,
        })
    }

    /// Create a client from a loaded configuration.
    pub fn from_config(
        config: &WorkspaceConfig,
        token_provider: Arc<dyn TokenProvider>,
    ) -> AzureResult<Self> {
        let mut workspace = Self::new(
            config.subscription_id.as_str(),
            config.resource_group.as_str(),
            config.name.as_str(),
            &config.location,
            token_provider,
        )?;
        if let Some(base_url) = &config.base_url {
            workspace = workspace.with_base_url(base_url.as_str());
        }
        if let Some(storage) = &config.storage {
            workspace = workspace.with_storage(storage.as_str());
        }
        Ok(workspace)
    }

    /// Override the base URL (for testing or sovereign clouds).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a caller-managed storage account instead of the linked one.
    pub fn with_storage(mut self, connection_string: impl Into<String>) -> Self {
        self.storage = Some(connection_string.into());
        self
    }

    /// Workspace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full API URL for a path below the workspace resource.
    fn url(&self, path: &str) -> String {
        format!(
            "{}{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Quantum/workspaces/{}/{}",
            self.base_url, API_PATH, self.subscription_id, self.resource_group, self.name, path
        )
    }

    async fn bearer(&self) -> AzureResult<String> {
        let token = self.token_provider.get_token().await?;
        Ok(format!("Bearer {token}"))
    }

    /// Fetch a job.
    #[instrument(skip(self))]
    pub async fn get_job_details(&self, job_id: &str) -> AzureResult<JobDetails> {
        let url = self.url(&format!("jobs/{job_id}"));
        debug!("Getting job from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        self.handle_response(response, job_id).await
    }

    /// Create a job.
    #[instrument(skip(self, details), fields(job_id = %details.id))]
    pub async fn create_job(&self, details: &JobDetails) -> AzureResult<JobDetails> {
        if details.id.as_str().is_empty() {
            return Err(AzureError::InvalidConfig("job id must not be empty".to_string()));
        }
        let url = self.url(&format!("jobs/{}", details.id));
        debug!("Creating job at {}", url);

        let response = self
            .client
            .put(&url)
            .header("Authorization", self.bearer().await?)
            .json(details)
            .send()
            .await?;

        self.handle_response(response, details.id.as_str()).await
    }

    /// Cancel a job and return its details afterwards.
    #[instrument(skip(self))]
    pub async fn cancel(&self, job_id: &str) -> AzureResult<JobDetails> {
        let url = self.url(&format!("jobs/{job_id}"));
        debug!("Cancelling job at {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.bearer().await?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_for(status, response, job_id).await);
        }

        self.get_job_details(job_id).await
    }

    /// Mint a SAS URI for a container (or one blob in it) of the linked
    /// storage account.
    #[instrument(skip(self))]
    pub async fn sas_uri(&self, container_name: &str, blob_name: Option<&str>) -> AzureResult<String> {
        let url = self.url("storage/sasUri");
        debug!("Requesting SAS URI for container {}", container_name);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .json(&SasUriRequest {
                container_name,
                blob_name,
            })
            .send()
            .await?;

        let body: SasUriResponse = self.handle_response(response, container_name).await?;
        Ok(body.sas_uri)
    }

    /// Handle HTTP response, extracting JSON or returning an error.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
        resource: &str,
    ) -> AzureResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.json().await?;
            Ok(body)
        } else {
            Err(Self::error_for(status, response, resource).await)
        }
    }

    async fn error_for(status: StatusCode, response: reqwest::Response, resource: &str) -> AzureError {
        let message = response.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AzureError::AuthFailed(message),
            StatusCode::NOT_FOUND => AzureError::NotFound(resource.to_string()),
            _ => AzureError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl Workspace for AzureWorkspace {
    fn storage(&self) -> Option<&str> {
        self.storage.as_deref()
    }

    async fn get_job(&self, job_id: &JobId) -> CoreResult<JobDetails> {
        Ok(self.get_job_details(job_id.as_str()).await?)
    }

    async fn linked_storage_sas_uri(
        &self,
        container_name: &str,
        blob_name: Option<&str>,
    ) -> CoreResult<String> {
        Ok(self.sas_uri(container_name, blob_name).await?)
    }

    async fn submit_job(&self, details: &JobDetails) -> CoreResult<JobDetails> {
        Ok(self.create_job(details).await?)
    }

    async fn cancel_job(&self, job_id: &JobId) -> CoreResult<JobDetails> {
        Ok(self.cancel(job_id.as_str()).await?)
    }
}
