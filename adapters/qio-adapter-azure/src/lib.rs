//! Azure collaborators for the QIO client.
//!
//! This crate implements the [`qio_core::Workspace`] and
//! [`qio_core::BlobStorage`] traits against Azure:
//!
//! - [`AzureWorkspace`] talks to the Azure Quantum data-plane REST API
//!   (job lookup, submission, cancellation, linked-storage SAS URIs)
//! - [`HttpBlobStorage`] uploads and downloads block blobs, minting service
//!   SAS tokens locally when a container was opened from an account key
//! - [`WorkspaceConfig`] loads workspace coordinates from YAML and `QIO_*`
//!   environment variables
//!
//! # Authentication
//!
//! | Service | Credential |
//! |---------|------------|
//! | Azure Quantum | bearer token from a [`qio_core::TokenProvider`] (`AZURE_QUANTUM_TOKEN`) |
//! | Linked storage | SAS URI minted by the workspace |
//! | Own storage | account key from the connection string in `QIO_STORAGE` |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qio_adapter_azure::{AzureWorkspace, HttpBlobStorage, WorkspaceConfig};
//! use qio_core::EnvTokenProvider;
//!
//! let config = WorkspaceConfig::load(None)?;
//! let workspace = AzureWorkspace::from_config(&config, Arc::new(EnvTokenProvider::azure_quantum()))?;
//! let storage = HttpBlobStorage::new()?;
//! ```

pub mod api;
pub mod blob;
pub mod config;
pub mod error;
pub mod sas;

pub use api::{AzureWorkspace, base_url_for_location};
pub use blob::{DEFAULT_SAS_LIFETIME, HttpBlobStorage, STORAGE_API_VERSION};
pub use config::{DEFAULT_PROVIDER, DEFAULT_TARGET, WorkspaceConfig};
pub use error::{AzureError, AzureResult};
pub use sas::{AccountSasBuilder, BlobSasBuilder, SAS_VERSION, SasPermissions};
