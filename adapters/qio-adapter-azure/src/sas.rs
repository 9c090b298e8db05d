//! Service SAS tokens for Azure Blob Storage.
//!
//! Tokens are signed locally with the storage account key (HMAC-SHA256 over
//! the service's string-to-sign for version [`SAS_VERSION`]), so a caller who
//! only has a connection string can hand out scoped, expiring blob URLs.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{AzureError, AzureResult};

/// Signed storage service version.
pub const SAS_VERSION: &str = "2019-12-12";

type HmacSha256 = Hmac<Sha256>;

/// Operations a SAS token grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SasPermissions {
    pub read: bool,
    pub add: bool,
    pub create: bool,
    pub write: bool,
    pub delete: bool,
    pub list: bool,
}

impl SasPermissions {
    /// Read only.
    pub fn read() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Read and create, enough to look up and create a container.
    pub fn read_create() -> Self {
        Self {
            read: true,
            create: true,
            ..Self::default()
        }
    }

    /// Create and write, enough to upload a block blob.
    pub fn create_write() -> Self {
        Self {
            create: true,
            write: true,
            ..Self::default()
        }
    }

    /// Everything a solver needs to read its input and write job artifacts.
    pub fn container_access() -> Self {
        Self {
            read: true,
            add: true,
            create: true,
            write: true,
            list: true,
            ..Self::default()
        }
    }
}

impl fmt::Display for SasPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The service requires this order: racwdl
        for (granted, flag) in [
            (self.read, 'r'),
            (self.add, 'a'),
            (self.create, 'c'),
            (self.write, 'w'),
            (self.delete, 'd'),
            (self.list, 'l'),
        ] {
            if granted {
                write!(f, "{flag}")?;
            }
        }
        Ok(())
    }
}

/// Service SAS for one blob, or a whole container when no blob is named.
#[derive(Debug, Clone)]
pub struct BlobSasBuilder {
    account_name: String,
    container_name: String,
    blob_name: Option<String>,
    permissions: SasPermissions,
    start: Option<DateTime<Utc>>,
    expiry: DateTime<Utc>,
    protocol: Option<String>,
}

impl BlobSasBuilder {
    /// Start a SAS for `container_name` in `account_name`.
    pub fn new(
        account_name: impl Into<String>,
        container_name: impl Into<String>,
        permissions: SasPermissions,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            account_name: account_name.into(),
            container_name: container_name.into(),
            blob_name: None,
            permissions,
            start: None,
            expiry,
            protocol: None,
        }
    }

    /// Scope the token to one blob.
    pub fn with_blob(mut self, blob_name: impl Into<String>) -> Self {
        self.blob_name = Some(blob_name.into());
        self
    }

    /// Set the time the token becomes valid.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Restrict the protocol (`"https"` or `"https,http"`).
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    fn resource(&self) -> &'static str {
        if self.blob_name.is_some() { "b" } else { "c" }
    }

    fn canonicalized_resource(&self) -> String {
        match &self.blob_name {
            Some(blob) => format!(
                "/blob/{}/{}/{}",
                self.account_name, self.container_name, blob
            ),
            None => format!("/blob/{}/{}", self.account_name, self.container_name),
        }
    }

    /// The exact text that is signed.
    pub fn string_to_sign(&self) -> String {
        let permissions = self.permissions.to_string();
        let start = self.start.map(format_time).unwrap_or_default();
        let expiry = format_time(self.expiry);
        let resource = self.canonicalized_resource();
        let fields = [
            permissions.as_str(),
            start.as_str(),
            expiry.as_str(),
            resource.as_str(),
            "", // signed identifier
            "", // signed IP
            self.protocol.as_deref().unwrap_or_default(),
            SAS_VERSION,
            self.resource(),
            "", // snapshot time
            "", // rscc
            "", // rscd
            "", // rsce
            "", // rscl
            "", // rsct
        ];
        fields.join("\n")
    }

    /// Sign with a base64 account key and return the query string (no `?`).
    pub fn sign(&self, account_key: &str) -> AzureResult<String> {
        let signature = hmac_signature(account_key, &self.string_to_sign())?;

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("sv", SAS_VERSION);
        if let Some(start) = self.start {
            query.append_pair("st", &format_time(start));
        }
        query.append_pair("se", &format_time(self.expiry));
        query.append_pair("sr", self.resource());
        query.append_pair("sp", &self.permissions.to_string());
        if let Some(protocol) = &self.protocol {
            query.append_pair("spr", protocol);
        }
        query.append_pair("sig", &signature);
        Ok(query.finish())
    }
}

/// Account SAS over the blob service's container-level operations.
///
/// A service SAS cannot create containers; this token can.
#[derive(Debug, Clone)]
pub struct AccountSasBuilder {
    account_name: String,
    permissions: SasPermissions,
    expiry: DateTime<Utc>,
}

impl AccountSasBuilder {
    pub fn new(
        account_name: impl Into<String>,
        permissions: SasPermissions,
        expiry: DateTime<Utc>,
    ) -> Self {
        Self {
            account_name: account_name.into(),
            permissions,
            expiry,
        }
    }

    /// The exact text that is signed.
    pub fn string_to_sign(&self) -> String {
        // account, permissions, services, resource types, start, expiry, IP,
        // protocol, version, each newline-terminated
        format!(
            "{}\n{}\nb\nc\n\n{}\n\n\n{}\n",
            self.account_name,
            self.permissions,
            format_time(self.expiry),
            SAS_VERSION
        )
    }

    /// Sign with a base64 account key and return the query string (no `?`).
    pub fn sign(&self, account_key: &str) -> AzureResult<String> {
        let signature = hmac_signature(account_key, &self.string_to_sign())?;

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("sv", SAS_VERSION);
        query.append_pair("ss", "b");
        query.append_pair("srt", "c");
        query.append_pair("sp", &self.permissions.to_string());
        query.append_pair("se", &format_time(self.expiry));
        query.append_pair("sig", &signature);
        Ok(query.finish())
    }
}

fn hmac_signature(account_key: &str, string_to_sign: &str) -> AzureResult<String> {
    let key = BASE64
        .decode(account_key)
        .map_err(|e| AzureError::Signing(format!("account key is not valid base64: {e}")))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|_| AzureError::Signing("Invalid HMAC key".to_string()))?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const KEY: &str = "c2VjcmV0LWtleQ==";

    fn expiry() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_permission_order() {
        let all = SasPermissions {
            read: true,
            add: true,
            create: true,
            write: true,
            delete: true,
            list: true,
        };
        assert_eq!(all.to_string(), "racwdl");
        assert_eq!(SasPermissions::create_write().to_string(), "cw");
        assert_eq!(SasPermissions::read().to_string(), "r");
    }

    #[test]
    fn test_string_to_sign_layout() {
        let sas = BlobSasBuilder::new("qiostore", "qio-problems", SasPermissions::read(), expiry())
            .with_blob("p-1");
        assert_eq!(
            sas.string_to_sign(),
            "r\n\n2030-01-01T00:00:00Z\n/blob/qiostore/qio-problems/p-1\n\n\n\n2019-12-12\nb\n\n\n\n\n\n"
        );

        let container = BlobSasBuilder::new("qiostore", "qio-problems", SasPermissions::read(), expiry());
        assert!(container.string_to_sign().contains("\n/blob/qiostore/qio-problems\n"));
        assert!(container.string_to_sign().contains("\n2019-12-12\nc\n"));
    }

    #[test]
    fn test_sign_known_vector() {
        let sas = BlobSasBuilder::new("qiostore", "qio-problems", SasPermissions::read(), expiry())
            .with_blob("p-1");
        assert_eq!(
            sas.sign(KEY).unwrap(),
            "sv=2019-12-12&se=2030-01-01T00%3A00%3A00Z&sr=b&sp=r&sig=kKEcggXHXEO0rw2PVZC%2BubEulsPd5LOYSWfMlj546Lc%3D"
        );
    }

    #[test]
    fn test_account_sas_known_vector() {
        let sas = AccountSasBuilder::new("qiostore", SasPermissions::read_create(), expiry());
        assert_eq!(
            sas.string_to_sign(),
            "qiostore\nrc\nb\nc\n\n2030-01-01T00:00:00Z\n\n\n2019-12-12\n"
        );
        assert_eq!(
            sas.sign(KEY).unwrap(),
            "sv=2019-12-12&ss=b&srt=c&sp=rc&se=2030-01-01T00%3A00%3A00Z&sig=J%2Bhox4Jdr6Ksy%2FA6XXdFSlXWJQnuEIgYDxONUjAFwpw%3D"
        );
    }

    #[test]
    fn test_sign_is_deterministic() {
        let build = || {
            BlobSasBuilder::new("qiostore", "c", SasPermissions::create_write(), expiry())
                .with_blob("b")
                .with_start(Utc.with_ymd_and_hms(2029, 12, 31, 23, 0, 0).unwrap())
                .with_protocol("https")
        };
        let first = build().sign(KEY).unwrap();
        assert_eq!(first, build().sign(KEY).unwrap());
        assert!(first.contains("st=2029-12-31T23%3A00%3A00Z"));
        assert!(first.contains("spr=https"));
        assert!(first.contains("sp=cw"));
    }

    #[test]
    fn test_sign_rejects_non_base64_key() {
        let sas = BlobSasBuilder::new("a", "c", SasPermissions::read(), expiry());
        assert!(matches!(sas.sign("not base64!"), Err(AzureError::Signing(_))));
    }
}
