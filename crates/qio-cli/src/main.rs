//! QIO Command-Line Interface
//!
//! Upload optimization problems, submit them to an Azure Quantum workspace,
//! and follow the resulting jobs.
//!
//! ```text
//! qio upload -i maxcut.json
//! qio submit -i maxcut.json --wait
//! qio status <job-id>
//! qio wait <job-id> --timeout 600
//! qio result <job-id> -o results.json
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{cancel, config, result, status, submit, upload, wait};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Upload {
            input,
            container,
            blob,
            no_compress,
        } => upload::execute(config_path, &input, &container, blob.as_deref(), !no_compress).await,

        Commands::Submit {
            input,
            target,
            params,
            wait: do_wait,
        } => {
            submit::execute(
                config_path,
                &input,
                target.as_deref(),
                params.as_deref(),
                do_wait,
            )
            .await
        }

        Commands::Status { job_id } => status::execute(config_path, &job_id).await,

        Commands::Wait {
            job_id,
            max_poll_wait,
            timeout,
        } => wait::execute(config_path, &job_id, max_poll_wait, timeout).await,

        Commands::Result { job_id, output } => {
            result::execute(config_path, &job_id, output.as_deref()).await
        }

        Commands::Cancel { job_id } => cancel::execute(config_path, &job_id).await,

        Commands::Config => config::execute(config_path),
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
