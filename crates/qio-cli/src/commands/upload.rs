//! Upload command implementation.

use anyhow::{Context, Result};
use console::style;

use qio_problem::UploadOptions;

use super::common::{connect, load_problem};

/// Execute the upload command.
pub async fn execute(
    config_path: Option<&str>,
    input: &str,
    container: &str,
    blob: Option<&str>,
    compress: bool,
) -> Result<()> {
    let problem = load_problem(input)?;
    let session = connect(config_path)?;

    println!(
        "{} Uploading {} ({} terms, {}) to container {}",
        style("→").cyan().bold(),
        style(problem.name()).bold(),
        problem.terms().len(),
        problem.problem_type(),
        style(container).dim()
    );

    let mut options = UploadOptions::default()
        .with_container_name(container)
        .with_compression(compress);
    if let Some(blob) = blob {
        options = options.with_blob_name(blob);
    }

    let uri = problem
        .upload(session.workspace.as_ref(), session.storage.as_ref(), &options)
        .await
        .context("Upload failed")?;

    println!("{} Uploaded", style("✓").green().bold());
    println!("{uri}");

    Ok(())
}
