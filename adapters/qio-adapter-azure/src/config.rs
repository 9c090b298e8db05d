//! Workspace configuration.
//!
//! Supports loading configuration from:
//! 1. A YAML file (default `<config dir>/qio/workspace.yaml`)
//! 2. Environment variables (with `QIO_` prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values
//!
//! ```yaml
//! subscription_id: 00000000-0000-0000-0000-000000000000
//! resource_group: optimization
//! name: my-workspace
//! location: westus
//! # storage: "DefaultEndpointsProtocol=https;AccountName=...;AccountKey=..."
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AzureError, AzureResult};

/// Default solver target for submitted problems.
pub const DEFAULT_TARGET: &str = "microsoft.paralleltempering-parameterfree.cpu";

/// Default provider for submitted problems.
pub const DEFAULT_PROVIDER: &str = "Microsoft";

/// Settings needed to reach one Azure Quantum workspace.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Azure subscription id.
    pub subscription_id: String,
    /// Resource group holding the workspace.
    pub resource_group: String,
    /// Workspace name.
    pub name: String,
    /// Azure region, e.g. `westus`.
    pub location: String,
    /// Connection string of a caller-managed storage account.
    pub storage: Option<String>,
    /// Override for the data-plane base URL.
    pub base_url: Option<String>,
    /// Provider jobs are submitted to.
    pub provider_id: Option<String>,
    /// Solver target jobs are submitted to.
    pub target: Option<String>,
}

impl fmt::Debug for WorkspaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceConfig")
            .field("subscription_id", &self.subscription_id)
            .field("resource_group", &self.resource_group)
            .field("name", &self.name)
            .field("location", &self.location)
            .field("storage", &self.storage.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("provider_id", &self.provider_id)
            .field("target", &self.target)
            .finish()
    }
}

impl WorkspaceConfig {
    /// Default location of the configuration file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qio").join("workspace.yaml"))
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AzureResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AzureError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;

        serde_yaml_ng::from_str(&contents)
            .map_err(|e| AzureError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    /// Load configuration with the following precedence:
    /// 1. Load from `config_file` if given, else from [`default_path`] if it exists
    /// 2. Apply environment variable overrides
    /// 3. Validate
    ///
    /// [`default_path`]: WorkspaceConfig::default_path
    pub fn load(config_file: Option<&Path>) -> AzureResult<Self> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(path)?,
                None => Self::default(),
            },
        };

        let config = config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Merge environment variables into this configuration.
    ///
    /// Only variables that are set override the file-loaded (or default)
    /// values.
    pub fn merge_env(mut self) -> Self {
        if let Ok(v) = std::env::var("QIO_SUBSCRIPTION_ID") {
            self.subscription_id = v;
        }
        if let Ok(v) = std::env::var("QIO_RESOURCE_GROUP") {
            self.resource_group = v;
        }
        if let Ok(v) = std::env::var("QIO_WORKSPACE") {
            self.name = v;
        }
        if let Ok(v) = std::env::var("QIO_LOCATION") {
            self.location = v;
        }
        if let Ok(v) = std::env::var("QIO_STORAGE") {
            self.storage = Some(v);
        }
        if let Ok(v) = std::env::var("QIO_BASE_URL") {
            self.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("QIO_PROVIDER") {
            self.provider_id = Some(v);
        }
        if let Ok(v) = std::env::var("QIO_TARGET") {
            self.target = Some(v);
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AzureResult<()> {
        for (field, value, var) in [
            ("subscription_id", &self.subscription_id, "QIO_SUBSCRIPTION_ID"),
            ("resource_group", &self.resource_group, "QIO_RESOURCE_GROUP"),
            ("name", &self.name, "QIO_WORKSPACE"),
            ("location", &self.location, "QIO_LOCATION"),
        ] {
            if value.trim().is_empty() {
                return Err(AzureError::MissingConfig(format!("{field} (set {var})")));
            }
        }

        if let Some(storage) = &self.storage {
            qio_core::ConnectionString::parse(storage)
                .map_err(|e| AzureError::InvalidConfig(e.to_string()))?;
        }

        if let Some(base_url) = &self.base_url {
            let parsed = url::Url::parse(base_url)
                .map_err(|e| AzureError::InvalidConfig(format!("base_url '{base_url}': {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AzureError::InvalidConfig(format!(
                    "base_url '{base_url}' must be http or https"
                )));
            }
        }

        Ok(())
    }

    /// Provider jobs are submitted to.
    pub fn provider_id(&self) -> &str {
        self.provider_id.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    /// Solver target jobs are submitted to.
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(DEFAULT_TARGET)
    }

    /// Render as YAML, with the storage connection string redacted.
    pub fn to_redacted_yaml(&self) -> AzureResult<String> {
        let mut shown = self.clone();
        if shown.storage.is_some() {
            shown.storage = Some("[REDACTED]".to_string());
        }
        serde_yaml_ng::to_string(&shown).map_err(|e| AzureError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> WorkspaceConfig {
        WorkspaceConfig {
            subscription_id: "sub".into(),
            resource_group: "rg".into(),
            name: "ws".into(),
            location: "westus".into(),
            ..WorkspaceConfig::default()
        }
    }

    #[test]
    fn test_validate_requires_identity_fields() {
        assert!(valid().validate().is_ok());

        let missing = WorkspaceConfig {
            location: String::new(),
            ..valid()
        };
        assert!(matches!(
            missing.validate(),
            Err(AzureError::MissingConfig(ref m)) if m.contains("QIO_LOCATION")
        ));
    }

    #[test]
    fn test_validate_rejects_bad_storage_and_base_url() {
        let bad_storage = WorkspaceConfig {
            storage: Some("nonsense".into()),
            ..valid()
        };
        assert!(matches!(bad_storage.validate(), Err(AzureError::InvalidConfig(_))));

        let bad_url = WorkspaceConfig {
            base_url: Some("ftp://example.com".into()),
            ..valid()
        };
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_target_defaults() {
        let config = valid();
        assert_eq!(config.provider_id(), DEFAULT_PROVIDER);
        assert_eq!(config.target(), DEFAULT_TARGET);
    }

    #[test]
    fn test_redacted_yaml_hides_storage() {
        let config = WorkspaceConfig {
            storage: Some("AccountName=a;AccountKey=c2VjcmV0".into()),
            ..valid()
        };
        let yaml = config.to_redacted_yaml().unwrap();
        assert!(yaml.contains("[REDACTED]"));
        assert!(!yaml.contains("c2VjcmV0"));
        assert!(!format!("{config:?}").contains("c2VjcmV0"));
    }
}
