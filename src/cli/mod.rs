pub mod run;
pub mod schema;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autorev")]
#[command(
    author,
    version,
    about = "Automated pull request review: lint, security scan, AI review, generated tests"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Review a pull request and post the consolidated report
    Run(RunArgs),

    /// Print JSON Schema for config validation
    Schema,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    /// Pull request URL, e.g. https://github.com/owner/repo/pull/42.
    /// Falls back to $PR_URL, then to `default_pr` in the config.
    #[arg(value_name = "PR_URL", env = "PR_URL")]
    pub pr: Option<String>,

    /// Path to config file (autorev.yaml is picked up when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override max concurrent analysis stages
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Override report output directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Overall deadline for the run, in seconds
    #[arg(long)]
    pub run_timeout: Option<u64>,

    /// Show the execution plan without calling any collaborator
    #[arg(long)]
    pub dry_run: bool,
}
