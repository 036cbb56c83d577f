// src/pipeline/finalization.rs

use crate::config::{ConfigFile, WorkflowSettings};
use crate::errors::Result;
use crate::graph::{JobGraphBuilder, Workflow};
use crate::pipeline::context::BuildContext;
use crate::segments::SegmentListDict;
use crate::stages;

pub const FINALIZATION_WORKFLOW: &str = "finalization";

/// The results-page workflow.
///
/// Its only job renders the whole results directory, which no single
/// artifact stands for, so it declares no inputs. Ordering after the
/// analysis comes from the container's explicit edge.
pub fn build_finalization(
    config: &ConfigFile,
    settings: &WorkflowSettings,
    ctx: &BuildContext,
) -> Result<Workflow> {
    let workflow = Workflow::new(
        FINALIZATION_WORKFLOW,
        settings.span,
        settings.detectors.clone(),
        ctx.output_dir(),
    );
    let mut builder = JobGraphBuilder::new(workflow, config, SegmentListDict::new());

    let page = stages::results_page()
        .with_option("plots-dir", ctx.layout.root().display().to_string());
    builder.run_stage(&page, &[], &[])?;

    builder.finish()
}
