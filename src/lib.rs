// src/lib.rs

pub mod artifact;
pub mod cli;
pub mod config;
pub mod emit;
pub mod errors;
pub mod expand;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod pipeline;
pub mod segments;
pub mod stages;
pub mod types;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{WorkflowSettings, load_and_validate, validate_config};
use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::pipeline::BuildContext;
use crate::segments::SegmentDocument;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and command-line overrides
/// - the input segment document
/// - pipeline construction
/// - emission (or a printed summary on dry runs)
pub fn run(args: CliArgs) -> Result<()> {
    let mut config = load_and_validate(&args.config)?;
    if !args.config_overrides.is_empty() {
        for spec in &args.config_overrides {
            config.apply_override(spec)?;
        }
        validate_config(&config)?;
        info!(count = args.config_overrides.len(), "applied config overrides");
    }

    let settings = WorkflowSettings::from_config(&config)?;
    let fs = RealFileSystem;
    let segments_path = config.resolve_path(&settings.segments_file);
    let source = SegmentDocument::load(&fs, &segments_path)?;
    debug!(path = ?segments_path, lists = source.keys().count(), "loaded segment document");

    // Locators end up as symlink targets, so they must not be relative.
    let output_dir = std::path::absolute(&args.output_dir)?;
    let mut ctx = BuildContext::new(&args.workflow_name, output_dir);
    let container = pipeline::build(&mut config, &source, &mut ctx)?;

    if args.dry_run {
        print!("{}", emit::summary(&container));
        debug!("dry-run complete (nothing written)");
        return Ok(());
    }

    let report = emit::write_outputs(&fs, &container, &mut ctx, &config)?;
    if report.links.failed > 0 {
        info!(failed = report.links.failed, "some results could not be linked");
    }
    Ok(())
}
