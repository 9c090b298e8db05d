//! Status command implementation.

use anyhow::Result;
use console::style;

use super::common::{connect, print_details};

/// Execute the status command.
pub async fn execute(config_path: Option<&str>, job_id: &str) -> Result<()> {
    let session = connect(config_path)?;
    let job = session.job(job_id).await?;

    println!("{} Job {}\n", style("→").cyan().bold(), style(job_id).dim());
    print_details(job.details());

    Ok(())
}
