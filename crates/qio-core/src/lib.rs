//! QIO client core
//!
//! This crate holds the parts of the optimization client that do not depend
//! on a particular cloud: job metadata, the job handle with its polling loop,
//! blob addressing, and the collaborator traits the handle talks through.
//!
//! # Overview
//!
//! - [`Workspace`] is the control plane: job lookup and linked-storage SAS URIs
//! - [`BlobStorage`] moves bytes to and from blob containers
//! - [`Job`] wraps [`JobDetails`], refreshes them, waits with a capped
//!   exponential backoff and downloads results exactly once
//! - [`TokenProvider`] supplies bearer tokens to REST implementations
//!
//! # Example: Waiting for Results
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use qio_core::{Job, JobId, WaitOptions};
//!
//! async fn run(workspace: Arc<dyn qio_core::Workspace>, storage: Arc<dyn qio_core::BlobStorage>)
//!     -> qio_core::CoreResult<()>
//! {
//!     let mut job = Job::fetch(workspace, storage, &JobId::new("6f1d...")).await?;
//!
//!     let options = WaitOptions::default().with_max_poll_wait(Duration::from_secs(5));
//!     job.wait_until_completed(&options).await?;
//!
//!     let results = job.get_results().await?;
//!     println!("{results}");
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod handle;
pub mod job;
pub mod poll;
pub mod storage;
pub mod workspace;

pub use auth::{AZURE_QUANTUM_TOKEN_VAR, EnvTokenProvider, StaticTokenProvider, TokenProvider};
pub use error::{CoreError, CoreResult};
pub use handle::Job;
pub use job::{ErrorData, JobDetails, JobId, JobStatus, QIO_INPUT_FORMAT, QIO_OUTPUT_FORMAT};
pub use poll::{
    DEFAULT_MAX_POLL_WAIT, DotProgress, INITIAL_POLL_WAIT, NoProgress, PollBackoff, PollObserver,
    WaitOptions,
};
pub use storage::{
    BlobStorage, BlobUri, ConnectionString, ContainerClient, StorageCredential, append_sas_token,
    has_sas_token, strip_sas_token,
};
pub use workspace::Workspace;
