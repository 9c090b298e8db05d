//! Blob storage collaborator.
//!
//! Problems are uploaded to, and results downloaded from, blob containers.
//! A container is reached either through a URL that already carries a SAS
//! token (the workspace's linked storage account) or through a caller-managed
//! storage account described by a connection string. This module holds the
//! value types for both cases and the [`BlobStorage`] trait that performs the
//! actual transfers.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use url::{Host, Url};

use crate::error::{CoreError, CoreResult};

/// Endpoint suffix of the public cloud.
pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Account name of the local storage emulator.
pub const DEVELOPMENT_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Well-known account key of the local storage emulator.
pub const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Blob endpoint of the local storage emulator.
pub const DEVELOPMENT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// Characters escaped when a container or blob name is put into a URL path.
/// `/` is kept so virtual directories in blob names survive.
const NAME_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// How requests against a storage account are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageCredential {
    /// A SAS token (query string without the leading `?`).
    Sas(String),
    /// Account name and base64 account key; SAS tokens are minted from it.
    SharedKey {
        /// Storage account name.
        account_name: String,
        /// Base64-encoded account key.
        account_key: String,
    },
    /// No credential (public containers).
    Anonymous,
}

impl fmt::Debug for StorageCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageCredential::Sas(_) => f.write_str("Sas([REDACTED])"),
            StorageCredential::SharedKey { account_name, .. } => f
                .debug_struct("SharedKey")
                .field("account_name", account_name)
                .field("account_key", &"[REDACTED]")
                .finish(),
            StorageCredential::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Parsed storage account connection string.
///
/// Understands `DefaultEndpointsProtocol`, `AccountName`, `AccountKey`,
/// `EndpointSuffix`, `BlobEndpoint`, `SharedAccessSignature` and
/// `UseDevelopmentStorage=true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    blob_endpoint: String,
    credential: StorageCredential,
}

impl ConnectionString {
    /// Parse a `Key=Value;Key=Value` connection string.
    pub fn parse(s: &str) -> CoreResult<Self> {
        let mut protocol = "https";
        let mut account_name = None;
        let mut account_key = None;
        let mut endpoint_suffix = DEFAULT_ENDPOINT_SUFFIX;
        let mut blob_endpoint = None;
        let mut sas = None;
        let mut development = false;

        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                CoreError::InvalidConnectionString(format!("expected Key=Value, got '{pair}'"))
            })?;
            match key {
                "DefaultEndpointsProtocol" => protocol = value,
                "AccountName" => account_name = Some(value),
                "AccountKey" => account_key = Some(value),
                "EndpointSuffix" => endpoint_suffix = value,
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/')),
                "SharedAccessSignature" => sas = Some(value.trim_start_matches('?')),
                "UseDevelopmentStorage" => development = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        if development {
            return Ok(Self {
                blob_endpoint: DEVELOPMENT_BLOB_ENDPOINT.to_string(),
                credential: StorageCredential::SharedKey {
                    account_name: DEVELOPMENT_ACCOUNT_NAME.to_string(),
                    account_key: DEVELOPMENT_ACCOUNT_KEY.to_string(),
                },
            });
        }

        let blob_endpoint = match (blob_endpoint, account_name) {
            (Some(endpoint), _) => endpoint.to_string(),
            (None, Some(name)) => format!("{protocol}://{name}.blob.{endpoint_suffix}"),
            (None, None) => {
                return Err(CoreError::InvalidConnectionString(
                    "missing AccountName or BlobEndpoint".to_string(),
                ));
            }
        };

        let credential = match (account_name, account_key, sas) {
            (Some(name), Some(key), _) => StorageCredential::SharedKey {
                account_name: name.to_string(),
                account_key: key.to_string(),
            },
            (_, _, Some(token)) => StorageCredential::Sas(token.to_string()),
            _ => {
                return Err(CoreError::InvalidConnectionString(
                    "missing AccountKey or SharedAccessSignature".to_string(),
                ));
            }
        };

        Ok(Self {
            blob_endpoint,
            credential,
        })
    }

    /// Blob service endpoint, without a trailing slash.
    pub fn blob_endpoint(&self) -> &str {
        &self.blob_endpoint
    }

    /// Credential the connection string carries.
    pub fn credential(&self) -> &StorageCredential {
        &self.credential
    }
}

impl FromStr for ConnectionString {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Handle to one blob container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerClient {
    account_url: String,
    container_name: String,
    credential: StorageCredential,
}

impl ContainerClient {
    /// Open a container from its URL; a query string is taken as a SAS token.
    pub fn from_container_url(container_url: &str) -> CoreResult<Self> {
        let url = parse_storage_url(container_url)?;
        let mut segments = path_segments(&url);
        let container_name = segments.pop().ok_or_else(|| CoreError::InvalidUri {
            uri: container_url.to_string(),
            reason: "no container name in path".to_string(),
        })?;

        let mut account_url = authority(&url);
        for segment in segments {
            account_url.push('/');
            account_url.push_str(segment);
        }

        let credential = match url.query() {
            Some(query) if !query.is_empty() => StorageCredential::Sas(query.to_string()),
            _ => StorageCredential::Anonymous,
        };

        Ok(Self {
            account_url,
            container_name: decode_name(container_name, container_url)?,
            credential,
        })
    }

    /// Open a container in the account described by a connection string.
    pub fn from_connection_string(
        connection_string: &str,
        container_name: impl Into<String>,
    ) -> CoreResult<Self> {
        let parsed = ConnectionString::parse(connection_string)?;
        Ok(Self {
            account_url: parsed.blob_endpoint,
            container_name: container_name.into(),
            credential: parsed.credential,
        })
    }

    /// Blob service endpoint of the account.
    pub fn account_url(&self) -> &str {
        &self.account_url
    }

    /// Name of the container.
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Credential used to reach the container.
    pub fn credential(&self) -> &StorageCredential {
        &self.credential
    }

    /// SAS token carried by the container URL, if any.
    pub fn sas_token(&self) -> Option<&str> {
        match &self.credential {
            StorageCredential::Sas(token) => Some(token),
            _ => None,
        }
    }

    /// Container URL without credentials.
    pub fn url(&self) -> String {
        format!("{}/{}", self.account_url, encode_name(&self.container_name))
    }

    /// URL of a blob in this container, without credentials.
    pub fn blob_url(&self, blob_name: &str) -> String {
        format!("{}/{}", self.url(), encode_name(blob_name))
    }
}

/// A blob URL split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobUri {
    account_url: String,
    container_name: String,
    blob_name: String,
    query: Option<String>,
}

impl BlobUri {
    /// Split a blob URL into account, container and blob name.
    ///
    /// Path-style URLs (IP address or `localhost` hosts, as used by the
    /// storage emulator) carry the account name as the first path segment.
    /// Container and blob names are percent-decoded.
    pub fn parse(blob_url: &str) -> CoreResult<Self> {
        let url = parse_storage_url(blob_url)?;
        let segments = path_segments(&url);
        let path_style = match url.host() {
            Some(Host::Ipv4(_) | Host::Ipv6(_)) => true,
            Some(Host::Domain(domain)) => domain == "localhost",
            None => false,
        };

        let mut account_url = authority(&url);
        let mut rest = segments.as_slice();
        if path_style {
            if let Some((account, tail)) = rest.split_first() {
                account_url.push('/');
                account_url.push_str(account);
                rest = tail;
            }
        }

        let (container, blob) = rest.split_first().ok_or_else(|| CoreError::InvalidUri {
            uri: blob_url.to_string(),
            reason: "no container name in path".to_string(),
        })?;
        if blob.is_empty() {
            return Err(CoreError::InvalidUri {
                uri: blob_url.to_string(),
                reason: "no blob name in path".to_string(),
            });
        }

        let blob_name = blob
            .iter()
            .map(|segment| decode_name(segment, blob_url))
            .collect::<CoreResult<Vec<_>>>()?
            .join("/");

        Ok(Self {
            account_url,
            container_name: decode_name(container, blob_url)?,
            blob_name,
            query: url.query().filter(|q| !q.is_empty()).map(str::to_string),
        })
    }

    /// Blob service endpoint of the account.
    pub fn account_url(&self) -> &str {
        &self.account_url
    }

    /// Name of the container holding the blob.
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    /// Name of the blob inside its container.
    pub fn blob_name(&self) -> &str {
        &self.blob_name
    }

    /// Query string of the original URL, if any.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Blob URL without query string.
    pub fn url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.account_url,
            encode_name(&self.container_name),
            encode_name(&self.blob_name)
        )
    }
}

/// Whether a URI carries a SAS token, judged by the presence of the `se`
/// (signed expiry) query parameter.
pub fn has_sas_token(uri: &str) -> CoreResult<bool> {
    let url = parse_storage_url(uri)?;
    Ok(url.query_pairs().any(|(key, _)| key == "se"))
}

/// Remove the query string (and with it any SAS token) from a URI.
pub fn strip_sas_token(uri: &str) -> CoreResult<String> {
    let mut url = parse_storage_url(uri)?;
    url.set_query(None);
    Ok(url.to_string())
}

/// Append a SAS token to a URL that has no query string.
pub fn append_sas_token(url: &str, sas_token: &str) -> String {
    format!("{}?{}", url, sas_token.trim_start_matches('?'))
}

fn parse_storage_url(uri: &str) -> CoreResult<Url> {
    let url = Url::parse(uri).map_err(|e| CoreError::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CoreError::InvalidUri {
            uri: uri.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

fn decode_name(segment: &str, uri: &str) -> CoreResult<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|name| name.into_owned())
        .map_err(|e| CoreError::InvalidUri {
            uri: uri.to_string(),
            reason: format!("path segment '{segment}' is not UTF-8: {e}"),
        })
}

fn encode_name(name: &str) -> String {
    utf8_percent_encode(name, NAME_ENCODE_SET).to_string()
}

fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

/// Blob transfer operations.
///
/// Implementations perform network I/O; failures surface as
/// [`CoreError::Storage`] (or [`CoreError::Auth`]) and are never retried here.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Upload `data` as a block blob and return its URI.
    ///
    /// When `return_sas_token` is set the returned URI carries a read SAS
    /// token; otherwise it is the bare blob URL.
    async fn upload_blob(
        &self,
        container: &ContainerClient,
        blob_name: &str,
        content_type: &str,
        content_encoding: &str,
        data: Vec<u8>,
        return_sas_token: bool,
    ) -> CoreResult<String>;

    /// Download the blob at `blob_uri`.
    async fn download_blob(&self, blob_uri: &str) -> CoreResult<Vec<u8>>;

    /// Create the container unless it already exists.
    ///
    /// The default assumes containers are provisioned elsewhere.
    async fn create_container(&self, _container: &ContainerClient) -> CoreResult<()> {
        Ok(())
    }

    /// URI of a container that a remote service may write into.
    ///
    /// The default hands out the container URL with whatever SAS token it
    /// was opened with.
    async fn container_uri(&self, container: &ContainerClient) -> CoreResult<String> {
        Ok(match container.sas_token() {
            Some(token) => append_sas_token(&container.url(), token),
            None => container.url(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONN: &str = "DefaultEndpointsProtocol=https;AccountName=qiostore;AccountKey=c2VjcmV0LWtleQ==;EndpointSuffix=core.windows.net";

    #[test]
    fn test_parse_account_key_connection_string() {
        let parsed = ConnectionString::parse(CONN).unwrap();
        assert_eq!(parsed.blob_endpoint(), "https://qiostore.blob.core.windows.net");
        assert_eq!(
            parsed.credential(),
            &StorageCredential::SharedKey {
                account_name: "qiostore".into(),
                account_key: "c2VjcmV0LWtleQ==".into(),
            }
        );
    }

    #[test]
    fn test_parse_sas_connection_string() {
        let parsed: ConnectionString =
            "BlobEndpoint=https://qiostore.blob.core.windows.net/;SharedAccessSignature=?sv=2019-12-12&se=2030-01-01&sig=abc"
                .parse()
                .unwrap();
        assert_eq!(parsed.blob_endpoint(), "https://qiostore.blob.core.windows.net");
        assert_eq!(
            parsed.credential(),
            &StorageCredential::Sas("sv=2019-12-12&se=2030-01-01&sig=abc".into())
        );
    }

    #[test]
    fn test_parse_development_storage() {
        let parsed = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();
        assert_eq!(parsed.blob_endpoint(), DEVELOPMENT_BLOB_ENDPOINT);
    }

    #[test]
    fn test_parse_connection_string_errors() {
        assert!(matches!(
            ConnectionString::parse("AccountName=qiostore"),
            Err(CoreError::InvalidConnectionString(_))
        ));
        assert!(matches!(
            ConnectionString::parse("AccountKey=abc"),
            Err(CoreError::InvalidConnectionString(_))
        ));
        assert!(matches!(
            ConnectionString::parse("garbage"),
            Err(CoreError::InvalidConnectionString(_))
        ));
    }

    #[test]
    fn test_container_from_sas_url() {
        let container = ContainerClient::from_container_url(
            "https://qiostore.blob.core.windows.net/qio-problems?sv=2019-12-12&se=2030-01-01&sp=rw&sig=abc",
        )
        .unwrap();
        assert_eq!(container.container_name(), "qio-problems");
        assert_eq!(container.account_url(), "https://qiostore.blob.core.windows.net");
        assert_eq!(
            container.sas_token(),
            Some("sv=2019-12-12&se=2030-01-01&sp=rw&sig=abc")
        );
        assert_eq!(
            container.blob_url("p-1"),
            "https://qiostore.blob.core.windows.net/qio-problems/p-1"
        );
    }

    #[test]
    fn test_container_from_connection_string() {
        let container = ContainerClient::from_connection_string(CONN, "qio-problems").unwrap();
        assert_eq!(
            container.url(),
            "https://qiostore.blob.core.windows.net/qio-problems"
        );
        assert!(container.sas_token().is_none());
    }

    #[test]
    fn test_blob_uri_parse() {
        let blob = BlobUri::parse(
            "https://qiostore.blob.core.windows.net/job-42/outputs/rawOutputData",
        )
        .unwrap();
        assert_eq!(blob.container_name(), "job-42");
        assert_eq!(blob.blob_name(), "outputs/rawOutputData");
        assert_eq!(blob.query(), None);
    }

    #[test]
    fn test_blob_uri_parse_path_style() {
        let blob =
            BlobUri::parse("http://127.0.0.1:10000/devstoreaccount1/job-42/rawOutputData?se=x")
                .unwrap();
        assert_eq!(blob.account_url(), DEVELOPMENT_BLOB_ENDPOINT);
        assert_eq!(blob.container_name(), "job-42");
        assert_eq!(blob.blob_name(), "rawOutputData");
        assert_eq!(blob.query(), Some("se=x"));
    }

    #[test]
    fn test_blob_uri_decodes_names() {
        let blob = BlobUri::parse(
            "https://qiostore.blob.core.windows.net/job-1/results/my%20output%23v2?se=x",
        )
        .unwrap();
        assert_eq!(blob.container_name(), "job-1");
        assert_eq!(blob.blob_name(), "results/my output#v2");
        assert_eq!(
            blob.url(),
            "https://qiostore.blob.core.windows.net/job-1/results/my%20output%23v2"
        );

        let container =
            ContainerClient::from_connection_string(CONN, "qio-problems").unwrap();
        assert_eq!(
            container.blob_url("max cut?"),
            "https://qiostore.blob.core.windows.net/qio-problems/max%20cut%3F"
        );
    }

    #[test]
    fn test_blob_uri_requires_blob_name() {
        assert!(BlobUri::parse("https://qiostore.blob.core.windows.net/job-42").is_err());
        assert!(BlobUri::parse("ftp://qiostore/job-42/blob").is_err());
    }

    #[test]
    fn test_has_sas_token() {
        assert!(has_sas_token("https://a.blob.core.windows.net/c/b?sv=1&se=2030-01-01&sig=x").unwrap());
        assert!(!has_sas_token("https://a.blob.core.windows.net/c/b").unwrap());
        assert!(!has_sas_token("https://a.blob.core.windows.net/c/b?sv=1&sig=x").unwrap());
        assert!(has_sas_token("not a uri").is_err());
    }

    #[test]
    fn test_strip_and_append_sas_token() {
        let bare = strip_sas_token("https://a.blob.core.windows.net/c/b?se=1&sig=x").unwrap();
        assert_eq!(bare, "https://a.blob.core.windows.net/c/b");
        assert_eq!(append_sas_token(&bare, "?se=1"), format!("{bare}?se=1"));
    }

    #[test]
    fn test_credential_debug_redacts() {
        let debug = format!(
            "{:?}",
            StorageCredential::SharedKey {
                account_name: "qiostore".into(),
                account_key: "c2VjcmV0LWtleQ==".into(),
            }
        );
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("c2VjcmV0"));
    }
}
