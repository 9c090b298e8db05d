//! Result command implementation.
//!
//! Download the results of a finished job.

use anyhow::{Context, Result};
use console::style;

use super::common::{connect, print_results};

/// Execute the result command.
pub async fn execute(config_path: Option<&str>, job_id: &str, output: Option<&str>) -> Result<()> {
    let session = connect(config_path)?;
    let mut job = session.job(job_id).await?;

    if !job.has_completed() {
        anyhow::bail!(
            "Job {job_id} is still {}. Use 'qio wait {job_id}' first.",
            job.status()
        );
    }

    let results = job
        .get_results()
        .await
        .with_context(|| format!("Failed to get results for job {job_id}"))?;

    match output {
        Some(path) => {
            let json = serde_json::to_string_pretty(results)?;
            std::fs::write(path, json).with_context(|| format!("Failed to write {path}"))?;
            println!(
                "{} Results written to {}",
                style("✓").green().bold(),
                style(path).bold()
            );
            Ok(())
        }
        None => print_results(results),
    }
}
