// src/pipeline/mod.rs

//! The coincident-search pipeline template.
//!
//! [`build`] runs the whole plan in order: settings and preflight checks,
//! segment planning, gating attachment, the analysis workflow, the
//! finalization workflow, and finally composition into one container.
//! Every configuration problem surfaces before the first job is planned.

pub mod analysis;
pub mod context;
pub mod finalization;
pub mod gating;
pub mod injections;
pub mod preflight;
pub mod segment_plan;

pub use analysis::{ANALYSIS_WORKFLOW, FULL_DATA, SharedProducts, build_analysis};
pub use context::BuildContext;
pub use finalization::{FINALIZATION_WORKFLOW, build_finalization};
pub use gating::{GatingFile, attach_gating};
pub use injections::{InjectionSet, build_injection_sets};
pub use preflight::{check_injection_tags, check_stage_sections};
pub use segment_plan::{SegmentPlan, plan_segments};

use tracing::info;

use crate::config::{ConfigFile, WorkflowSettings};
use crate::errors::Result;
use crate::graph::{Container, SubworkflowComposer};
use crate::segments::SegmentDocument;

/// Build the full container from a validated configuration and the input
/// segment document.
///
/// `config` is mutated once, by gating attachment, and only read afterwards.
pub fn build(
    config: &mut ConfigFile,
    source: &SegmentDocument,
    ctx: &mut BuildContext,
) -> Result<Container> {
    let settings = WorkflowSettings::from_config(config)?;
    check_stage_sections(config, &settings)?;
    check_injection_tags(&settings)?;

    let plan = plan_segments(source, &settings)?;
    let gating = attach_gating(config, &settings.detectors);

    let config: &ConfigFile = config;
    let analysis = build_analysis(config, &settings, &plan, &gating, ctx)?;
    let finalization = build_finalization(config, &settings, ctx)?;

    let container =
        SubworkflowComposer::compose(ctx.name(), settings.detectors.clone(), analysis, finalization)?;
    info!(
        container = %container.name(),
        detectors = %settings.detectors,
        tiers = plan.tiers.len(),
        injection_sets = settings.injection_tags.len(),
        "workflow planned"
    );
    Ok(container)
}
