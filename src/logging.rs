// src/logging.rs

//! Logging setup for `coincflow`.
//!
//! The `--log-level` flag wins. Without it, `COINCFLOW_LOG` is read as a
//! full filter directive (`info`, `coincflow::graph=debug,warn`, ...);
//! anything it cannot parse is dropped and `info` applies.
//!
//! Logs go to stderr. The dry-run summary is the only thing on stdout.

use anyhow::{Result, anyhow};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "COINCFLOW_LOG";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    fmt()
        .with_env_filter(build_filter(cli_level, env.as_deref()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

/// Filter for the given flag and environment value.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
    match (cli_level, env) {
        (Some(level), _) => builder.parse_lossy(level_filter(level).to_string()),
        (None, Some(directives)) => builder.parse_lossy(directives),
        (None, None) => builder.parse_lossy(""),
    }
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}
