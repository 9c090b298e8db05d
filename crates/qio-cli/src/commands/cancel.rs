//! Cancel command implementation.

use anyhow::{Context, Result};
use console::style;

use super::common::{connect, styled_status};

/// Execute the cancel command.
pub async fn execute(config_path: Option<&str>, job_id: &str) -> Result<()> {
    let session = connect(config_path)?;
    let mut job = session.job(job_id).await?;

    if job.has_completed() {
        println!(
            "{} Job {} already finished: {}",
            style("!").yellow().bold(),
            job_id,
            styled_status(job.status())
        );
        return Ok(());
    }

    job.cancel()
        .await
        .with_context(|| format!("Failed to cancel job {job_id}"))?;

    println!(
        "{} Job {} is now {}",
        style("✓").green().bold(),
        job_id,
        styled_status(job.status())
    );

    Ok(())
}
