//! Submit command implementation.
//!
//! Uploads the problem into a per-job container, created on first use, and
//! creates the job.

use anyhow::{Context, Result};
use console::style;
use uuid::Uuid;

use qio_core::{ContainerClient, Job, JobDetails, WaitOptions};
use qio_problem::UploadOptions;

use super::common::{SpinnerProgress, connect, load_problem, parse_params, print_results};

/// Blob name the service expects the problem under.
const INPUT_BLOB_NAME: &str = "inputData";

/// Execute the submit command.
pub async fn execute(
    config_path: Option<&str>,
    input: &str,
    target: Option<&str>,
    params: Option<&str>,
    wait: bool,
) -> Result<()> {
    let problem = load_problem(input)?;
    let input_params = params.map(parse_params).transpose()?;
    let session = connect(config_path)?;

    let job_id = Uuid::new_v4().to_string();
    let container_name = format!("job-{job_id}");
    let target = target.unwrap_or_else(|| session.config.target());

    println!(
        "{} Submitting {} to {}",
        style("→").cyan().bold(),
        style(problem.name()).bold(),
        style(target).cyan()
    );

    let container_uri = match session.workspace.storage() {
        None => {
            session
                .workspace
                .linked_storage_sas_uri(&container_name, None)
                .await
        }
        Some(connection_string) => {
            let container =
                ContainerClient::from_connection_string(connection_string, &container_name)?;
            session.storage.container_uri(&container).await
        }
    }
    .context("Failed to get a URI for the job container")?;

    let input_uri = problem
        .upload(
            session.workspace.as_ref(),
            session.storage.as_ref(),
            &UploadOptions::default()
                .with_container_name(&container_name)
                .with_blob_name(INPUT_BLOB_NAME),
        )
        .await
        .context("Upload failed")?;

    let mut request = JobDetails::for_problem(
        job_id.as_str(),
        problem.name(),
        input_uri,
        session.config.provider_id(),
        target,
    )
    .with_container_uri(container_uri);
    if let Some(input_params) = input_params {
        request = request.with_input_params(input_params);
    }

    let submitted = session
        .workspace
        .submit_job(&request)
        .await
        .context("Failed to submit job")?;

    println!(
        "{} Job submitted: {}",
        style("✓").green().bold(),
        style(&submitted.id).bold()
    );

    if !wait {
        println!("  Check status with: qio status {}", submitted.id);
        return Ok(());
    }

    let mut job = Job::new(session.workspace, session.storage, submitted);
    job.wait_until_completed_with(&WaitOptions::default(), &mut SpinnerProgress::new())
        .await?;

    if !job.status().is_success() {
        anyhow::bail!("Job {} finished with status {}", job.id(), job.status());
    }

    println!("{} Job completed", style("✓").green().bold());
    print_results(job.get_results().await?)
}
