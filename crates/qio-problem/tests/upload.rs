//! Upload path selection against in-memory collaborators.

use std::io::Read;
use std::sync::Mutex;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use qio_core::{BlobStorage, ContainerClient, CoreResult, JobDetails, JobId, Workspace};
use qio_problem::{Problem, Term, UploadOptions};

const CONNECTION_STRING: &str = "DefaultEndpointsProtocol=https;AccountName=qiostore;AccountKey=c2VjcmV0LWtleQ==;EndpointSuffix=core.windows.net";

struct FakeWorkspace {
    storage: Option<String>,
    sas_requests: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeWorkspace {
    fn linked() -> Self {
        Self {
            storage: None,
            sas_requests: Mutex::new(Vec::new()),
        }
    }

    fn with_storage(connection_string: &str) -> Self {
        Self {
            storage: Some(connection_string.to_string()),
            sas_requests: Mutex::new(Vec::new()),
        }
    }

    fn sas_requests(&self) -> Vec<(String, Option<String>)> {
        self.sas_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Workspace for FakeWorkspace {
    fn storage(&self) -> Option<&str> {
        self.storage.as_deref()
    }

    async fn get_job(&self, job_id: &JobId) -> CoreResult<JobDetails> {
        Ok(JobDetails::new(job_id.clone()))
    }

    async fn linked_storage_sas_uri(
        &self,
        container_name: &str,
        blob_name: Option<&str>,
    ) -> CoreResult<String> {
        self.sas_requests
            .lock()
            .unwrap()
            .push((container_name.to_string(), blob_name.map(str::to_string)));
        Ok(format!(
            "https://linked.blob.core.windows.net/{container_name}?sv=2019-12-12&sr=c&sp=rw&se=2030-01-01&sig=abc"
        ))
    }
}

#[derive(Debug, Clone)]
struct RecordedUpload {
    account_url: String,
    container: String,
    sas_token: Option<String>,
    blob_name: String,
    content_type: String,
    content_encoding: String,
    data: Vec<u8>,
    return_sas_token: bool,
}

#[derive(Default)]
struct RecordingStorage {
    uploads: Mutex<Vec<RecordedUpload>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingStorage {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn single_upload(&self) -> RecordedUpload {
        let uploads = self.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        uploads[0].clone()
    }
}

#[async_trait]
impl BlobStorage for RecordingStorage {
    async fn upload_blob(
        &self,
        container: &ContainerClient,
        blob_name: &str,
        content_type: &str,
        content_encoding: &str,
        data: Vec<u8>,
        return_sas_token: bool,
    ) -> CoreResult<String> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("upload {}/{}", container.container_name(), blob_name));
        self.uploads.lock().unwrap().push(RecordedUpload {
            account_url: container.account_url().to_string(),
            container: container.container_name().to_string(),
            sas_token: container.sas_token().map(str::to_string),
            blob_name: blob_name.to_string(),
            content_type: content_type.to_string(),
            content_encoding: content_encoding.to_string(),
            data,
            return_sas_token,
        });
        let uri = container.blob_url(blob_name);
        Ok(if return_sas_token {
            format!("{uri}?se=2030-01-01&sig=read")
        } else {
            uri
        })
    }

    async fn download_blob(&self, _blob_uri: &str) -> CoreResult<Vec<u8>> {
        unreachable!("uploads never download")
    }

    async fn create_container(&self, container: &ContainerClient) -> CoreResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("create {}", container.container_name()));
        Ok(())
    }
}

fn sample_problem() -> Problem {
    let mut problem = Problem::new("sample");
    problem.add_term(1, vec![0, 1]).unwrap();
    problem.add_terms(vec![Term::new(-2.5, vec![1, 2]).unwrap()]);
    problem
}

fn gunzip(data: &[u8]) -> String {
    let mut out = String::new();
    GzDecoder::new(data).read_to_string(&mut out).unwrap();
    out
}

#[tokio::test]
async fn test_linked_storage_upload() {
    let workspace = FakeWorkspace::linked();
    let storage = RecordingStorage::default();
    let problem = sample_problem();

    let uri = problem
        .upload(&workspace, &storage, &UploadOptions::default())
        .await
        .unwrap();

    assert_eq!(
        workspace.sas_requests(),
        vec![("qio-problems".to_string(), None)]
    );

    let upload = storage.single_upload();
    assert!(!upload.return_sas_token);
    assert_eq!(upload.account_url, "https://linked.blob.core.windows.net");
    assert_eq!(upload.container, "qio-problems");
    assert!(upload.sas_token.unwrap().contains("sig=abc"));
    assert_eq!(upload.content_type, "application/json");
    assert_eq!(upload.content_encoding, "gzip");
    assert_eq!(gunzip(&upload.data), problem.serialize().unwrap());

    assert!(upload.blob_name.starts_with("sample-"));
    assert_eq!(upload.blob_name.len(), "sample-".len() + 36);
    assert_eq!(
        uri,
        format!(
            "https://linked.blob.core.windows.net/qio-problems/{}",
            upload.blob_name
        )
    );
}

#[tokio::test]
async fn test_connection_string_upload() {
    let workspace = FakeWorkspace::with_storage(CONNECTION_STRING);
    let storage = RecordingStorage::default();
    let problem = sample_problem();

    let options = UploadOptions::default()
        .with_container_name("my-problems")
        .with_blob_name("fixed-name")
        .with_compression(false);
    let uri = problem.upload(&workspace, &storage, &options).await.unwrap();

    assert!(workspace.sas_requests().is_empty());

    let upload = storage.single_upload();
    assert!(upload.return_sas_token);
    assert_eq!(upload.account_url, "https://qiostore.blob.core.windows.net");
    assert_eq!(upload.container, "my-problems");
    assert_eq!(upload.sas_token, None);
    assert_eq!(upload.blob_name, "fixed-name");
    assert_eq!(upload.content_encoding, "");
    assert_eq!(upload.data, problem.serialize().unwrap().into_bytes());
    assert!(uri.contains("se="));
}

#[tokio::test]
async fn test_container_is_created_before_upload() {
    let problem = sample_problem();
    let options = UploadOptions::default()
        .with_container_name("job-42")
        .with_blob_name("inputData");

    for workspace in [
        FakeWorkspace::linked(),
        FakeWorkspace::with_storage(CONNECTION_STRING),
    ] {
        let storage = RecordingStorage::default();
        problem.upload(&workspace, &storage, &options).await.unwrap();
        assert_eq!(
            storage.calls(),
            vec!["create job-42".to_string(), "upload job-42/inputData".to_string()]
        );
    }
}

#[tokio::test]
async fn test_upload_leaves_problem_untouched() {
    let workspace = FakeWorkspace::linked();
    let storage = RecordingStorage::default();
    let problem = sample_problem();
    let before = problem.clone();

    problem
        .upload(&workspace, &storage, &UploadOptions::default())
        .await
        .unwrap();
    problem
        .upload(&workspace, &storage, &UploadOptions::default())
        .await
        .unwrap();

    assert_eq!(problem, before);
    let uploads = storage.uploads.lock().unwrap();
    assert_ne!(uploads[0].blob_name, uploads[1].blob_name);
}

#[tokio::test]
async fn test_bad_connection_string_fails_before_upload() {
    let workspace = FakeWorkspace::with_storage("AccountName=only");
    let storage = RecordingStorage::default();

    let result = sample_problem()
        .upload(&workspace, &storage, &UploadOptions::default())
        .await;

    assert!(result.is_err());
    assert!(storage.calls().is_empty());
}
