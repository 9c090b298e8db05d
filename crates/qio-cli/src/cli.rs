//! Command-line arguments.

use clap::{Parser, Subcommand};

/// qio - submit optimization problems to Azure Quantum and fetch results
#[derive(Debug, Parser)]
#[command(name = "qio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Workspace configuration file (default: <config dir>/qio/workspace.yaml)
    #[arg(short, long, global = true, env = "QIO_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a problem file to blob storage and print its URI
    Upload {
        /// Problem file (JSON)
        #[arg(short, long)]
        input: String,

        /// Target container
        #[arg(long, default_value = "qio-problems")]
        container: String,

        /// Blob name (default: <problem name>-<uuid>)
        #[arg(long)]
        blob: Option<String>,

        /// Upload uncompressed JSON
        #[arg(long)]
        no_compress: bool,
    },

    /// Upload a problem file and submit it as a job
    Submit {
        /// Problem file (JSON)
        #[arg(short, long)]
        input: String,

        /// Solver target (default: from configuration)
        #[arg(short, long)]
        target: Option<String>,

        /// Solver parameters as a JSON object
        #[arg(short, long)]
        params: Option<String>,

        /// Wait for the job to complete and print its results
        #[arg(short, long)]
        wait: bool,
    },

    /// Show the details of a job
    Status {
        /// Job ID
        job_id: String,
    },

    /// Wait for a job to complete
    Wait {
        /// Job ID
        job_id: String,

        /// Longest wait between two polls, in seconds
        #[arg(long, default_value = "30")]
        max_poll_wait: f64,

        /// Give up after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Download the results of a job
    Result {
        /// Job ID
        job_id: String,

        /// Write results to this file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Cancel a job
    Cancel {
        /// Job ID
        job_id: String,
    },

    /// Show the effective workspace configuration
    Config,
}
