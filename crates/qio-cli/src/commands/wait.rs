//! Wait command implementation.
//!
//! Poll a job with backoff until it reaches a terminal state.

use std::time::Duration;

use anyhow::Result;
use console::style;

use qio_core::{CoreError, WaitOptions};

use super::common::{SpinnerProgress, connect, print_details};

/// Execute the wait command.
pub async fn execute(
    config_path: Option<&str>,
    job_id: &str,
    max_poll_wait: f64,
    timeout: Option<u64>,
) -> Result<()> {
    let mut options = WaitOptions::default().with_max_poll_wait(
        Duration::try_from_secs_f64(max_poll_wait)
            .map_err(|e| anyhow::anyhow!("Invalid --max-poll-wait {max_poll_wait}: {e}"))?,
    );
    if let Some(timeout) = timeout {
        options = options.with_timeout(Duration::from_secs(timeout));
    }

    let session = connect(config_path)?;
    let mut job = session.job(job_id).await?;

    match timeout {
        Some(secs) => println!(
            "{} Waiting for job {} (timeout: {}s)",
            style("→").cyan().bold(),
            style(job_id).dim(),
            secs
        ),
        None => println!(
            "{} Waiting for job {}",
            style("→").cyan().bold(),
            style(job_id).dim()
        ),
    }

    let mut spinner = SpinnerProgress::new();
    let waited = job.wait_until_completed_with(&options, &mut spinner).await;
    match waited {
        Ok(()) => {}
        Err(CoreError::Timeout(_)) => anyhow::bail!(
            "Timeout. Job {} is still {}. Use 'qio status {}' to check later.",
            job_id,
            job.status(),
            job_id
        ),
        Err(e) => return Err(e.into()),
    }

    if job.status().is_success() {
        println!("{} Job completed\n", style("✓").green().bold());
    } else {
        println!(
            "{} Job finished with status: {}\n",
            style("✗").red().bold(),
            style(job.status()).red()
        );
    }
    print_details(job.details());

    Ok(())
}
