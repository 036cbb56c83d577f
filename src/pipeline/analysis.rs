// src/pipeline/analysis.rs

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::artifact::{ArtifactId, ResultSection};
use crate::config::{ConfigFile, WorkflowSettings};
use crate::errors::{CoincflowError, Result};
use crate::graph::{ExternalArtifact, JobGraphBuilder, StageFactory, Workflow};
use crate::pipeline::context::BuildContext;
use crate::pipeline::gating::GatingFile;
use crate::pipeline::injections::build_injection_sets;
use crate::pipeline::segment_plan::SegmentPlan;
use crate::stages::{self, TMPLTBANK};
use crate::types::{DetectorSet, Tag};

pub const ANALYSIS_WORKFLOW: &str = "analysis";
pub const FULL_DATA: &str = "full_data";

/// Full-data products that every injection set consumes again.
#[derive(Debug, Clone)]
pub struct SharedProducts {
    pub segments: ArtifactId,
    pub datafind: Vec<ArtifactId>,
    pub psds: Vec<ArtifactId>,
    pub gating: Vec<ArtifactId>,
    pub template_bank: ArtifactId,
    pub split_banks: Vec<ArtifactId>,
    /// Tag of the most restrictive veto tier, if any tier exists.
    pub final_tier: Option<Tag>,
}

impl SharedProducts {
    /// Everything a matched-filter job of any tag reads besides its
    /// injection file.
    pub fn filter_inputs(&self) -> Vec<ArtifactId> {
        let mut inputs = self.split_banks.clone();
        inputs.extend(&self.datafind);
        inputs.extend(&self.psds);
        inputs.extend(&self.gating);
        inputs
    }
}

/// Build the analysis workflow: segments, data discovery, PSDs, the bank
/// and its split, full-data filtering through statistics, then every
/// configured injection set.
pub fn build_analysis(
    config: &ConfigFile,
    settings: &WorkflowSettings,
    plan: &SegmentPlan,
    gating: &[GatingFile],
    ctx: &mut BuildContext,
) -> Result<Workflow> {
    let workflow = Workflow::new(
        ANALYSIS_WORKFLOW,
        settings.span,
        settings.detectors.clone(),
        ctx.output_dir(),
    );
    let mut builder = JobGraphBuilder::new(workflow, config, plan.analyzable.clone());
    let span = settings.span;
    let all = settings.detectors.clone();

    // Planner-written files.
    let segments_path = ctx.planned_path(&all, "WORKFLOW_SEGMENTS", &span, "json");
    let segments = builder.register_external(external(
        "segments",
        "SEGMENTS",
        all.clone(),
        settings,
        segments_path.clone(),
    ))?;
    ctx.segment_output = Some((segments_path, plan.document.clone()));
    classify(&builder, ctx, &[segments], ResultSection::AnalysisTime)?;

    let config_path = ctx.planned_path(&all, "WORKFLOW_CONFIG", &span, "toml");
    let config_dump = builder.register_external(external(
        "configuration",
        "CONFIG",
        all.clone(),
        settings,
        config_path.clone(),
    ))?;
    ctx.config_output = Some(config_path);
    classify(&builder, ctx, &[config_dump], ResultSection::Workflow)?;

    let segment_plot = builder.run_stage(&stages::plot_segments(), &[segments], &[])?;
    classify(&builder, ctx, &segment_plot, ResultSection::AnalysisTime)?;

    let mut gating_ids = Vec::with_capacity(gating.len());
    for file in gating {
        gating_ids.push(builder.register_external(external(
            "gating",
            "GATING",
            DetectorSet::single(&file.detector),
            settings,
            file.path.clone(),
        ))?);
    }

    // Data and noise.
    let datafind = builder.run_stage(&stages::datafind(), &[], &[])?;
    let mut psd_inputs = datafind.clone();
    psd_inputs.extend(&gating_ids);
    let psds = builder.run_stage(&stages::calculate_psd(), &psd_inputs, &[])?;
    let spectrum = builder.run_stage(&stages::plot_spectrum(), &psds, &[])?;
    classify(&builder, ctx, &spectrum, ResultSection::DetectorSensitivity)?;

    // Template bank.
    let template_bank = template_bank(&mut builder, config, settings, &psds)?;
    let split_banks = builder.run_stage(&stages::splitbank(settings.num_banks), &[template_bank], &[])?;

    let final_tier = plan.tiers.last().map(|t| t.name.to_lowercase());
    let shared = SharedProducts {
        segments,
        datafind,
        psds,
        gating: gating_ids,
        template_bank,
        split_banks,
        final_tier,
    };

    // Full-data search.
    let full: Vec<Tag> = vec![FULL_DATA.to_string()];
    let triggers = builder.run_stage(&stages::inspiral(), &shared.filter_inputs(), &full)?;
    let merged = builder.run_stage(&stages::trigger_merge(), &triggers, &full)?;
    let singles = builder.run_stage(&stages::plot_singles(), &merged, &full)?;
    classify(&builder, ctx, &singles, ResultSection::SingleTriggers)?;

    let mut tier_tags: Vec<Option<Tag>> = plan
        .tiers
        .iter()
        .map(|t| Some(t.name.to_lowercase()))
        .collect();
    if tier_tags.is_empty() {
        debug!("no veto ladder; statistics run once on analyzable time");
        tier_tags.push(None);
    }

    let mut coinc_inputs = merged.clone();
    coinc_inputs.push(shared.template_bank);
    coinc_inputs.push(shared.segments);

    let mut final_statmap = Vec::new();
    for tier in &tier_tags {
        let mut tags = full.clone();
        tags.extend(tier.iter().cloned());
        let coinc = builder.run_stage(&stages::coinc(), &coinc_inputs, &tags)?;
        let statmap = builder.run_stage(&stages::statmap(), &coinc, &tags)?;
        classify(&builder, ctx, &statmap, ResultSection::CoincidentTriggers)?;
        final_statmap = statmap;
    }

    let foreground = builder.run_stage(&stages::page_foreground(), &final_statmap, &full)?;
    classify(&builder, ctx, &foreground, ResultSection::OpenBoxResult)?;

    let injection_sets = build_injection_sets(&mut builder, settings, &shared, ctx)?;

    let workflow = builder.finish()?;
    info!(
        workflow = %workflow.name(),
        jobs = workflow.jobs().len(),
        artifacts = workflow.artifacts().len(),
        injection_sets = injection_sets.len(),
        "built analysis workflow"
    );
    Ok(workflow)
}

/// A pregenerated bank named by `[tmpltbank] bank-file` is used as is;
/// otherwise one bank-generation job runs on the PSDs.
fn template_bank(
    builder: &mut JobGraphBuilder<'_>,
    config: &ConfigFile,
    settings: &WorkflowSettings,
    psds: &[ArtifactId],
) -> Result<ArtifactId> {
    if let Some(path) = config.get(TMPLTBANK, "bank-file") {
        info!(path, "using pregenerated template bank");
        let locator = config.resolve_path(path);
        return builder.register_external(external(
            TMPLTBANK,
            "BANK",
            settings.detectors.clone(),
            settings,
            locator,
        ));
    }

    let factory = stages::tmpltbank();
    let outputs = builder.run_stage(&factory, psds, &[])?;
    match outputs.as_slice() {
        [bank] => Ok(*bank),
        other => Err(CoincflowError::GraphError(format!(
            "{} must produce exactly one bank, got {}",
            factory.stage(),
            other.len()
        ))),
    }
}

fn external(
    stage: &str,
    name: &str,
    detectors: DetectorSet,
    settings: &WorkflowSettings,
    locator: std::path::PathBuf,
) -> ExternalArtifact {
    ExternalArtifact {
        stage: stage.to_string(),
        name: name.to_string(),
        tags: Vec::new(),
        detectors,
        segment: settings.span,
        locator,
        metadata: BTreeMap::new(),
    }
}

/// Record artifacts for the results page.
pub(crate) fn classify(
    builder: &JobGraphBuilder<'_>,
    ctx: &mut BuildContext,
    ids: &[ArtifactId],
    section: ResultSection,
) -> Result<()> {
    for id in ids {
        ctx.report.classify(builder.artifact(*id)?, section);
    }
    Ok(())
}
