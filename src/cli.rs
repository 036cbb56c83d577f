// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `coincflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "coincflow",
    version,
    about = "Plan a coincident-search analysis workflow as a job DAG.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the workflow config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "coincflow.toml")]
    pub config: PathBuf,

    /// Name of the top-level container workflow.
    #[arg(long, value_name = "NAME", default_value = "coinc_search")]
    pub workflow_name: String,

    /// Directory that receives the workflow document, segment files and
    /// the results tree.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Override a config value, as `SECTION:OPTION:VALUE`.
    ///
    /// Missing sections are created. May be given more than once.
    #[arg(long = "config-override", value_name = "SECTION:OPTION:VALUE")]
    pub config_overrides: Vec<String>,

    /// Log level; takes precedence over `COINCFLOW_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build the DAG and print a summary, but don't write anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
