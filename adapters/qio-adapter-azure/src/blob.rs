//! Azure Blob Storage over its REST API.

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use flate2::read::GzDecoder;
use qio_core::{
    BlobStorage, BlobUri, ContainerClient, CoreResult, StorageCredential, append_sas_token,
};
use reqwest::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use crate::error::{AzureError, AzureResult};
use crate::sas::{AccountSasBuilder, BlobSasBuilder, SAS_VERSION, SasPermissions};

/// Storage service version sent with every request.
pub const STORAGE_API_VERSION: &str = SAS_VERSION;

/// Default validity of SAS tokens minted from an account key.
pub const DEFAULT_SAS_LIFETIME: Duration = Duration::from_secs(2 * 24 * 60 * 60);

const UPLOAD_SAS_LIFETIME: Duration = Duration::from_secs(15 * 60);

/// [`BlobStorage`] backed by the Azure Blob REST API.
///
/// Containers opened from a SAS URL are used as-is. Containers opened from a
/// connection string with an account key get service SAS tokens minted
/// locally: a short-lived create/write token for the upload itself, and a
/// read token (valid for [`DEFAULT_SAS_LIFETIME`] unless overridden) for the
/// URI handed back to the caller. Containers are created on demand; with an
/// account key this goes through a short-lived account SAS.
#[derive(Debug, Clone)]
pub struct HttpBlobStorage {
    client: Client,
    sas_lifetime: Duration,
}

impl HttpBlobStorage {
    /// Create a client with default timeouts.
    pub fn new() -> AzureResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Use an existing HTTP client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            sas_lifetime: DEFAULT_SAS_LIFETIME,
        }
    }

    /// Validity of read tokens returned from uploads.
    pub fn with_sas_lifetime(mut self, lifetime: Duration) -> Self {
        self.sas_lifetime = lifetime;
        self
    }

    /// URL of `blob_name` carrying a SAS token with `permissions`, or the bare
    /// URL for anonymous containers.
    pub fn blob_url_with_sas(
        &self,
        container: &ContainerClient,
        blob_name: &str,
        permissions: SasPermissions,
        lifetime: Duration,
    ) -> AzureResult<String> {
        let url = container.blob_url(blob_name);
        match container.credential() {
            StorageCredential::Sas(token) => Ok(append_sas_token(&url, token)),
            StorageCredential::SharedKey {
                account_name,
                account_key,
            } => {
                let lifetime = chrono::Duration::from_std(lifetime)
                    .map_err(|e| AzureError::Signing(format!("SAS lifetime out of range: {e}")))?;
                let token = BlobSasBuilder::new(
                    account_name.as_str(),
                    container.container_name(),
                    permissions,
                    Utc::now() + lifetime,
                )
                .with_blob(blob_name)
                .sign(account_key)?;
                Ok(append_sas_token(&url, &token))
            }
            StorageCredential::Anonymous => Ok(url),
        }
    }

    /// URL of the container itself with a container-scoped token.
    pub fn container_url_with_sas(
        &self,
        container: &ContainerClient,
        permissions: SasPermissions,
    ) -> AzureResult<String> {
        match container.credential() {
            StorageCredential::Sas(token) => Ok(append_sas_token(&container.url(), token)),
            StorageCredential::SharedKey {
                account_name,
                account_key,
            } => {
                let lifetime = chrono::Duration::from_std(self.sas_lifetime)
                    .map_err(|e| AzureError::Signing(format!("SAS lifetime out of range: {e}")))?;
                let token = BlobSasBuilder::new(
                    account_name.as_str(),
                    container.container_name(),
                    permissions,
                    Utc::now() + lifetime,
                )
                .sign(account_key)?;
                Ok(append_sas_token(&container.url(), &token))
            }
            StorageCredential::Anonymous => Ok(container.url()),
        }
    }

    /// Container URL for container-level requests (`restype=container`).
    fn container_request_url(&self, container: &ContainerClient) -> AzureResult<String> {
        let url = format!("{}?restype=container", container.url());
        let token = match container.credential() {
            StorageCredential::Sas(token) => token.trim_start_matches('?').to_string(),
            StorageCredential::SharedKey {
                account_name,
                account_key,
            } => {
                let lifetime = chrono::Duration::from_std(UPLOAD_SAS_LIFETIME)
                    .map_err(|e| AzureError::Signing(format!("SAS lifetime out of range: {e}")))?;
                AccountSasBuilder::new(
                    account_name.as_str(),
                    SasPermissions::read_create(),
                    Utc::now() + lifetime,
                )
                .sign(account_key)?
            }
            StorageCredential::Anonymous => return Ok(url),
        };
        Ok(format!("{url}&{token}"))
    }

    /// Look the container up and create it if the service does not know it.
    async fn ensure_container(&self, container: &ContainerClient) -> AzureResult<()> {
        let url = self.container_request_url(container)?;
        let name = container.container_name();

        let response = self
            .client
            .get(&url)
            .header("x-ms-version", STORAGE_API_VERSION)
            .send()
            .await?;
        if response.status() != StatusCode::NOT_FOUND {
            return check_status(response, name).await.map(|_| ());
        }

        debug!("Creating container {}", container.url());
        let response = self
            .client
            .put(&url)
            .header("x-ms-version", STORAGE_API_VERSION)
            .header(CONTENT_LENGTH, 0)
            .send()
            .await?;
        // 409: created by someone else in the meantime
        if response.status() == StatusCode::CONFLICT {
            return Ok(());
        }
        check_status(response, name).await.map(|_| ())
    }

    async fn put_block_blob(
        &self,
        container: &ContainerClient,
        blob_name: &str,
        content_type: &str,
        content_encoding: &str,
        data: Vec<u8>,
        return_sas_token: bool,
    ) -> AzureResult<String> {
        let upload_url = self.blob_url_with_sas(
            container,
            blob_name,
            SasPermissions::create_write(),
            UPLOAD_SAS_LIFETIME,
        )?;
        debug!(
            "Uploading {} bytes to {}",
            data.len(),
            container.blob_url(blob_name)
        );

        let mut request = self
            .client
            .put(&upload_url)
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header(CONTENT_TYPE, content_type)
            .body(data);
        if !content_encoding.is_empty() {
            request = request.header(CONTENT_ENCODING, content_encoding);
        }

        let response = request.send().await?;
        check_status(response, &format!("{}/{}", container.container_name(), blob_name)).await?;

        if return_sas_token {
            self.blob_url_with_sas(container, blob_name, SasPermissions::read(), self.sas_lifetime)
        } else {
            Ok(container.blob_url(blob_name))
        }
    }

    async fn get_blob(&self, blob_uri: &str) -> AzureResult<Vec<u8>> {
        let blob = BlobUri::parse(blob_uri)?;
        debug!("Downloading {}", blob.url());

        let response = self
            .client
            .get(blob_uri)
            .header("x-ms-version", STORAGE_API_VERSION)
            .send()
            .await?;
        let response =
            check_status(response, &format!("{}/{}", blob.container_name(), blob.blob_name()))
                .await?;

        let gzipped = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));
        let body = response.bytes().await?;

        if gzipped {
            let mut decoded = Vec::new();
            GzDecoder::new(&body[..])
                .read_to_end(&mut decoded)
                .map_err(AzureError::Decompression)?;
            Ok(decoded)
        } else {
            Ok(body.to_vec())
        }
    }
}

/// Map a storage response status onto the adapter's errors.
async fn check_status(response: reqwest::Response, what: &str) -> AzureResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AzureError::AuthFailed(format!(
            "{what}: {message}"
        ))),
        StatusCode::NOT_FOUND => Err(AzureError::NotFound(what.to_string())),
        _ => Err(AzureError::ApiError {
            status: status.as_u16(),
            message,
        }),
    }
}

#[async_trait]
impl BlobStorage for HttpBlobStorage {
    #[instrument(skip(self, container, data), fields(container = container.container_name()))]
    async fn upload_blob(
        &self,
        container: &ContainerClient,
        blob_name: &str,
        content_type: &str,
        content_encoding: &str,
        data: Vec<u8>,
        return_sas_token: bool,
    ) -> CoreResult<String> {
        self.put_block_blob(
            container,
            blob_name,
            content_type,
            content_encoding,
            data,
            return_sas_token,
        )
        .await
        .map_err(AzureError::into_storage_error)
    }

    #[instrument(skip_all)]
    async fn download_blob(&self, blob_uri: &str) -> CoreResult<Vec<u8>> {
        self.get_blob(blob_uri)
            .await
            .map_err(AzureError::into_storage_error)
    }

    #[instrument(skip_all, fields(container = container.container_name()))]
    async fn create_container(&self, container: &ContainerClient) -> CoreResult<()> {
        self.ensure_container(container)
            .await
            .map_err(AzureError::into_storage_error)
    }

    async fn container_uri(&self, container: &ContainerClient) -> CoreResult<String> {
        self.container_url_with_sas(container, SasPermissions::container_access())
            .map_err(AzureError::into_storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qio_core::has_sas_token;

    const CONN: &str = "DefaultEndpointsProtocol=https;AccountName=qiostore;AccountKey=c2VjcmV0LWtleQ==;EndpointSuffix=core.windows.net";

    #[test]
    fn test_shared_key_container_mints_blob_sas() {
        let storage = HttpBlobStorage::with_client(Client::new());
        let container = ContainerClient::from_connection_string(CONN, "qio-problems").unwrap();

        let url = storage
            .blob_url_with_sas(&container, "p-1", SasPermissions::read(), DEFAULT_SAS_LIFETIME)
            .unwrap();

        assert!(url.starts_with("https://qiostore.blob.core.windows.net/qio-problems/p-1?sv="));
        assert!(url.contains("sr=b"));
        assert!(url.contains("sp=r"));
        assert!(has_sas_token(&url).unwrap());
    }

    #[test]
    fn test_sas_container_reuses_its_token() {
        let storage = HttpBlobStorage::with_client(Client::new());
        let container = ContainerClient::from_container_url(
            "https://linked.blob.core.windows.net/jobs?sv=2019-12-12&sr=c&sp=rw&se=2030-01-01&sig=abc",
        )
        .unwrap();

        let url = storage
            .blob_url_with_sas(
                &container,
                "p-1",
                SasPermissions::create_write(),
                UPLOAD_SAS_LIFETIME,
            )
            .unwrap();
        assert_eq!(
            url,
            "https://linked.blob.core.windows.net/jobs/p-1?sv=2019-12-12&sr=c&sp=rw&se=2030-01-01&sig=abc"
        );
    }

    #[tokio::test]
    async fn test_shared_key_container_uri_is_container_scoped() {
        let storage = HttpBlobStorage::with_client(Client::new());
        let container = ContainerClient::from_connection_string(CONN, "job-1").unwrap();

        let uri = storage.container_uri(&container).await.unwrap();

        assert!(uri.starts_with("https://qiostore.blob.core.windows.net/job-1?sv="));
        assert!(uri.contains("sr=c"));
        assert!(uri.contains("sp=racwl"));
    }

    #[test]
    fn test_container_request_url_uses_account_sas() {
        let storage = HttpBlobStorage::with_client(Client::new());

        let shared = ContainerClient::from_connection_string(CONN, "job-1").unwrap();
        let url = storage.container_request_url(&shared).unwrap();
        assert!(url.starts_with("https://qiostore.blob.core.windows.net/job-1?restype=container&sv="));
        assert!(url.contains("srt=c"));
        assert!(url.contains("sp=rc"));

        let linked = ContainerClient::from_container_url(
            "https://linked.blob.core.windows.net/jobs?se=2030-01-01&sig=abc",
        )
        .unwrap();
        assert_eq!(
            storage.container_request_url(&linked).unwrap(),
            "https://linked.blob.core.windows.net/jobs?restype=container&se=2030-01-01&sig=abc"
        );
    }

    #[test]
    fn test_anonymous_container_has_bare_urls() {
        let storage = HttpBlobStorage::with_client(Client::new());
        let container =
            ContainerClient::from_container_url("https://public.blob.core.windows.net/open").unwrap();
        let url = storage
            .blob_url_with_sas(&container, "b", SasPermissions::read(), DEFAULT_SAS_LIFETIME)
            .unwrap();
        assert_eq!(url, "https://public.blob.core.windows.net/open/b");
    }
}
