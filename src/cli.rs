// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::exec::{LEDGER_DIR_ENV, TESTCASE_ENV};
use crate::types::{OrderStrategyKind, RecordStatus, TestOutcome};

/// Command-line arguments for `suitedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "suitedag",
    version,
    about = "Run dependent, delayed testcases in parallel and record their results.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SUITEDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Schedule and run every testcase from the config file.
    Run(RunArgs),
    /// Record the result of one test into the ledger (used by worker processes).
    Record(RecordArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Maximum number of testcases running at once (overrides the config file).
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,

    /// Directory of the result ledger (overrides the config file).
    #[arg(long, value_name = "DIR")]
    pub ledger_dir: Option<PathBuf>,

    /// Order strategy used when more testcases are eligible than slots are free.
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub order: Option<OrderStrategyKind>,

    /// JSON file of historical testcase durations (for `--order history`).
    #[arg(long, value_name = "PATH")]
    pub history: Option<PathBuf>,

    /// Only run testcases in one of these groups.
    #[arg(long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Never run testcases in these groups.
    #[arg(long = "exclude-group", value_name = "GROUP")]
    pub exclude_groups: Vec<String>,

    /// Ignore delays between testcases; dependency order still applies.
    #[arg(long)]
    pub ignore_delays: bool,

    /// Exit with 0 even when testcases failed.
    #[arg(long)]
    pub no_exit: bool,

    /// Validate and print the testcase tree, but don't start anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
    /// Directory of the result ledger.
    #[arg(long, value_name = "DIR", env = LEDGER_DIR_ENV)]
    pub ledger_dir: PathBuf,

    /// Testcase the test belongs to.
    #[arg(long, value_name = "ID", env = TESTCASE_ENV)]
    pub testcase: String,

    /// Name of the individual test.
    #[arg(long, value_name = "NAME")]
    pub test: String,

    #[arg(long, value_enum)]
    pub status: RecordStatus,

    #[arg(long, value_enum)]
    pub outcome: Option<TestOutcome>,

    #[arg(long)]
    pub message: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
