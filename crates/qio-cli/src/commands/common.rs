//! Shared helpers for CLI commands.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use qio_adapter_azure::{AzureWorkspace, HttpBlobStorage, WorkspaceConfig};
use qio_core::{
    BlobStorage, EnvTokenProvider, Job, JobDetails, JobId, JobStatus, PollObserver, Workspace,
};
use qio_problem::Problem;

/// A connected workspace and the storage client used alongside it.
pub struct Session {
    pub config: WorkspaceConfig,
    pub workspace: Arc<dyn Workspace>,
    pub storage: Arc<dyn BlobStorage>,
}

impl Session {
    /// Fetch the current state of a job.
    pub async fn job(&self, job_id: &str) -> Result<Job> {
        Job::fetch(
            Arc::clone(&self.workspace),
            Arc::clone(&self.storage),
            &JobId::new(job_id),
        )
        .await
        .with_context(|| format!("Failed to get job {job_id}"))
    }
}

/// Load the workspace configuration.
pub fn load_config(config_path: Option<&str>) -> Result<WorkspaceConfig> {
    WorkspaceConfig::load(config_path.map(Path::new)).context("Invalid workspace configuration")
}

/// Load the configuration and build the Azure clients it describes.
pub fn connect(config_path: Option<&str>) -> Result<Session> {
    let config = load_config(config_path)?;
    debug!(
        "Connecting to workspace {} in {} ({})",
        config.name,
        config.location,
        if config.storage.is_some() { "own storage" } else { "linked storage" }
    );

    let workspace = AzureWorkspace::from_config(&config, Arc::new(EnvTokenProvider::azure_quantum()))
        .context("Failed to create workspace client")?;
    let storage = HttpBlobStorage::new().context("Failed to create storage client")?;

    Ok(Session {
        config,
        workspace: Arc::new(workspace),
        storage: Arc::new(storage),
    })
}

/// Load a problem from a JSON file.
pub fn load_problem(path: &str) -> Result<Problem> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }

    Problem::load(path).with_context(|| format!("Failed to load problem from {path}"))
}

/// Parse `--params` into a JSON object.
pub fn parse_params(params: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_json::from_str(params).context("Solver parameters are not valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("Solver parameters must be a JSON object, got: {value}");
    }
    Ok(value)
}

/// Status text colored by outcome.
pub fn styled_status(status: &JobStatus) -> console::StyledObject<&str> {
    let name = status.as_str();
    match status {
        JobStatus::Succeeded => style(name).green().bold(),
        JobStatus::Failed | JobStatus::Cancelled => style(name).red().bold(),
        JobStatus::Waiting => style(name).yellow().bold(),
        _ => style(name).cyan().bold(),
    }
}

/// Print the details of a job.
pub fn print_details(details: &JobDetails) {
    println!("  {:<12} {}", style("ID:").bold(), details.id);
    if let Some(name) = &details.name {
        println!("  {:<12} {}", style("Name:").bold(), name);
    }
    println!("  {:<12} {}", style("Status:").bold(), styled_status(&details.status));
    if let Some(target) = &details.target {
        println!("  {:<12} {}", style("Target:").bold(), target);
    }
    if let Some(created) = details.creation_time {
        println!(
            "  {:<12} {}",
            style("Created:").bold(),
            created.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if let Some(ended) = details.end_execution_time {
        println!(
            "  {:<12} {}",
            style("Finished:").bold(),
            ended.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if let Some(began) = details.begin_execution_time {
            let runtime = ended - began;
            println!(
                "  {:<12} {:.1}s",
                style("Runtime:").bold(),
                runtime.num_milliseconds() as f64 / 1000.0
            );
        }
    }
    if let Some(error) = &details.error_data {
        println!("  {:<12} {}", style("Error:").red().bold(), error);
    }
}

/// Print job results as pretty JSON.
pub fn print_results(results: &serde_json::Value) -> Result<()> {
    let json = serde_json::to_string_pretty(results).context("JSON serialization failed")?;
    println!("{json}");
    Ok(())
}

/// Spinner shown while a job is polled.
pub struct SpinnerProgress {
    spinner: ProgressBar,
}

impl SpinnerProgress {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Waiting for job to complete...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner }
    }
}

impl PollObserver for SpinnerProgress {
    fn on_poll(&mut self, _job_id: &JobId, status: &JobStatus, next_wait: Duration) {
        self.spinner.set_message(format!(
            "Status: {} (next check in {:.1}s)",
            status,
            next_wait.as_secs_f64()
        ));
    }

    fn on_finish(&mut self, _job_id: &JobId, _status: &JobStatus, _polls: usize) {
        self.spinner.finish_and_clear();
    }
}
