// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::OutputFormat;

/// Command-line arguments for `playjobs`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "playjobs",
    version,
    about = "Run a playbook command as a tracked job and follow its output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PLAYJOBS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Output format; overrides `[output].format`.
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Kill the job after this long (e.g. "90s", "10m"); overrides
    /// `[runner].timeout`.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// How often to poll the job status.
    #[arg(long, value_name = "DURATION", default_value = "200ms")]
    pub poll_interval: String,

    /// Load + validate config, print it, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Program to run followed by its arguments (after `--`).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
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
