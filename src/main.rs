//! zimdown: convert ZIM archive articles to Markdown
//!
//! Runs the resumable batch conversion over an ordinal range, or a single
//! id, and reports progress from the durable tracker state.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use zimdown::config::{Config, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "zimdown")]
#[command(about = "Convert ZIM archive articles to Markdown with tags and images")]
#[command(version)]
struct Cli {
    /// Configuration file path (default: zimdown.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding the tracker state files
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show tracker statistics and failure records
    Status {
        /// Print at most this many failure records (default: all)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// First ordinal to process
    #[arg(long)]
    pub start: Option<u64>,

    /// Last ordinal to process, inclusive
    #[arg(long)]
    pub end: Option<u64>,

    /// Resume after the highest completed id (default)
    #[arg(long, conflicts_with = "no_resume")]
    pub resume: bool,

    /// Start at --start even if later ids already completed
    #[arg(long)]
    pub no_resume: bool,

    /// Process only this id, e.g. scp-173
    #[arg(long, value_name = "ID")]
    pub single: Option<String>,

    /// Stop after this many failures in a row
    #[arg(long)]
    pub max_failures: Option<u32>,

    /// ZIM archive path (overrides SCP_OFFLINE_ZIM_PATH)
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Output root (overrides SCP_MD_OUTPUT_DIR)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Id prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Extract every image of an article instead of the first
    #[arg(long)]
    pub all_images: bool,

    /// Quiet mode (no progress bar)
    #[arg(short, long)]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let dotenv_path = dotenvy::dotenv().ok();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_optional(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    config.apply_env();
    if let Some(state_dir) = &cli.state_dir {
        config.tracking.state_dir = state_dir.clone();
    }

    let log_file = zimdown::logging::init(&config.logging, cli.verbose)
        .context("Failed to initialize logging")?;
    if let Some(path) = dotenv_path {
        debug!("Loaded environment from {}", path.display());
    }
    if let Some(path) = log_file {
        debug!("Logging to {}", path.display());
    }

    match cli.command {
        Some(Commands::Status { limit }) => {
            commands::status::show_status(&config, limit)?;
            Ok(ExitCode::SUCCESS)
        }
        None => commands::convert::run(config, cli.run).await,
    }
}
