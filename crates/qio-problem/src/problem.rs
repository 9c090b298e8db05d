//! Optimization problems, their wire format and upload.
//!
//! A [`Problem`] serializes to
//!
//! ```text
//! {"cost_function": {"version": "1.0" | "1.1",
//!                    "type": "ising" | "pubo",
//!                    "terms": [{"c": .., "ids": [..]}, ..],
//!                    "initial_configuration": {..}}}
//! ```
//!
//! where `initial_configuration` and version `1.1` appear only when an
//! initial configuration is set.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use flate2::Compression;
use flate2::write::GzEncoder;
use qio_core::{BlobStorage, ContainerClient, Workspace};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::coefficient::Coefficient;
use crate::error::{ProblemError, ProblemResult};
use crate::term::Term;

/// Container problems are uploaded to unless told otherwise.
pub const DEFAULT_CONTAINER_NAME: &str = "qio-problems";

/// Content type of uploaded problems.
pub const PROBLEM_CONTENT_TYPE: &str = "application/json";

const VERSION: &str = "1.0";
const VERSION_WITH_INITIAL_CONFIGURATION: &str = "1.1";

/// Kind of cost function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemType {
    /// Spin variables in {-1, 1}.
    #[default]
    Ising,
    /// Binary variables in {0, 1}.
    Pubo,
}

impl ProblemType {
    /// Wire name of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ising => "ising",
            Self::Pubo => "pubo",
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProblemType {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ising" => Ok(Self::Ising),
            "pubo" => Ok(Self::Pubo),
            other => Err(ProblemError::Validation(format!(
                "Unknown problem type '{other}' (expected 'ising' or 'pubo')"
            ))),
        }
    }
}

/// Where and how [`Problem::upload`] stores the problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Target container.
    pub container_name: String,
    /// Blob name; `"{problem name}-{uuid}"` when unset.
    pub blob_name: Option<String>,
    /// Gzip the payload.
    pub compress: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            blob_name: None,
            compress: true,
        }
    }
}

impl UploadOptions {
    /// Set the container.
    pub fn with_container_name(mut self, container_name: impl Into<String>) -> Self {
        self.container_name = container_name.into();
        self
    }

    /// Set the blob name.
    pub fn with_blob_name(mut self, blob_name: impl Into<String>) -> Self {
        self.blob_name = Some(blob_name.into());
        self
    }

    /// Enable or disable gzip compression.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// A serialized problem ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedProblem {
    /// Payload bytes, gzip-compressed when `content_encoding` is `"gzip"`.
    pub data: Vec<u8>,
    /// `"gzip"` or empty.
    pub content_encoding: &'static str,
}

#[derive(Serialize)]
struct Document<'a> {
    cost_function: CostFunction<'a>,
}

#[derive(Serialize)]
struct CostFunction<'a> {
    version: &'static str,
    #[serde(rename = "type")]
    problem_type: ProblemType,
    terms: &'a [Term],
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_configuration: Option<&'a BTreeMap<String, i64>>,
}

/// A named cost function over a set of variables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Problem {
    name: String,
    terms: Vec<Term>,
    problem_type: ProblemType,
    init_config: BTreeMap<String, i64>,
}

impl Problem {
    /// Create an empty Ising problem.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Start from an initial list of terms.
    pub fn with_terms(mut self, terms: Vec<Term>) -> Self {
        self.terms = terms;
        self
    }

    /// Set the problem type.
    pub fn with_problem_type(mut self, problem_type: ProblemType) -> Self {
        self.problem_type = problem_type;
        self
    }

    /// Set the initial configuration. Variable ids are stored as strings.
    pub fn with_init_config<K, I>(mut self, init_config: I) -> Self
    where
        K: ToString,
        I: IntoIterator<Item = (K, i64)>,
    {
        self.init_config = init_config
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self
    }

    /// Problem name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Terms in insertion order.
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Problem type.
    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    /// Initial configuration, keyed by variable id.
    pub fn init_config(&self) -> &BTreeMap<String, i64> {
        &self.init_config
    }

    /// Set the initial value of one variable.
    pub fn set_initial_value(&mut self, variable: impl ToString, value: i64) {
        self.init_config.insert(variable.to_string(), value);
    }

    /// Append one term built from a coefficient and its variables.
    pub fn add_term(&mut self, c: impl Into<Coefficient>, indices: Vec<u32>) -> ProblemResult<()> {
        self.terms.push(Term::new(c, indices)?);
        Ok(())
    }

    /// Append pre-built terms, keeping their order.
    pub fn add_terms(&mut self, terms: impl IntoIterator<Item = Term>) {
        self.terms.extend(terms);
    }

    /// Serialize to the JSON wire format.
    pub fn serialize(&self) -> ProblemResult<String> {
        let has_init_config = !self.init_config.is_empty();
        let document = Document {
            cost_function: CostFunction {
                version: if has_init_config {
                    VERSION_WITH_INITIAL_CONFIGURATION
                } else {
                    VERSION
                },
                problem_type: self.problem_type,
                terms: &self.terms,
                initial_configuration: has_init_config.then_some(&self.init_config),
            },
        };
        Ok(serde_json::to_string(&document)?)
    }

    /// Serialize and optionally gzip the problem.
    pub fn encode(&self, compress: bool) -> ProblemResult<EncodedProblem> {
        let problem_json = self.serialize()?;
        debug!("Problem json: {}", problem_json);

        if !compress {
            return Ok(EncodedProblem {
                data: problem_json.into_bytes(),
                content_encoding: "",
            });
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(problem_json.as_bytes())
            .map_err(ProblemError::Compression)?;
        let data = encoder.finish().map_err(ProblemError::Compression)?;

        Ok(EncodedProblem {
            data,
            content_encoding: "gzip",
        })
    }

    /// Upload the problem to blob storage and return its URI.
    ///
    /// Without a caller-managed storage account the workspace's linked
    /// storage is used through a container SAS URI it mints, and the bare
    /// blob URI is returned. With one, the container is opened from the
    /// connection string and the returned URI carries a read SAS token.
    /// Either way the container is created first if it does not exist yet.
    #[instrument(skip_all, fields(problem = %self.name))]
    pub async fn upload(
        &self,
        workspace: &dyn Workspace,
        storage: &dyn BlobStorage,
        options: &UploadOptions,
    ) -> ProblemResult<String> {
        let blob_name = match &options.blob_name {
            Some(name) => name.clone(),
            None => format!("{}-{}", self.name, Uuid::new_v4()),
        };

        let encoded = self.encode(options.compress)?;

        let (container, return_sas_token) = match workspace.storage() {
            None => {
                let container_uri = workspace
                    .linked_storage_sas_uri(&options.container_name, None)
                    .await?;
                (ContainerClient::from_container_url(&container_uri)?, false)
            }
            Some(connection_string) => (
                ContainerClient::from_connection_string(
                    connection_string,
                    options.container_name.as_str(),
                )?,
                true,
            ),
        };

        storage.create_container(&container).await?;

        debug!(
            "Uploading {} bytes to {}/{}",
            encoded.data.len(),
            container.container_name(),
            blob_name
        );

        let uri = storage
            .upload_blob(
                &container,
                &blob_name,
                PROBLEM_CONTENT_TYPE,
                encoded.content_encoding,
                encoded.data,
                return_sas_token,
            )
            .await?;

        Ok(uri)
    }
}
