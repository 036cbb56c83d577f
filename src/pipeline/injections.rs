// src/pipeline/injections.rs

use std::collections::BTreeMap;

use tracing::info;

use crate::artifact::{ArtifactId, ResultSection};
use crate::config::WorkflowSettings;
use crate::config::settings::INJECTIONS_SECTION;
use crate::errors::{CoincflowError, Result};
use crate::expand::{Axis, ConditionalStage, StepResolution, TagExpander, cardinality};
use crate::graph::{JobGraphBuilder, StageFactory};
use crate::pipeline::analysis::{SharedProducts, classify};
use crate::pipeline::context::BuildContext;
use crate::pipeline::preflight::INJECTION_OPTIONS;
use crate::stages;
use crate::types::Tag;

/// One injection set after its optional preprocessing chain.
#[derive(Debug, Clone)]
pub struct InjectionSet {
    pub tag: Tag,
    /// File the matched filter and `injfind` actually read.
    pub injection_file: ArtifactId,
    pub steps: Vec<StepResolution>,
}

/// Build every `[workflow-injections-{tag}]` set into the analysis workflow.
///
/// Matched filtering fans out over detector × tag; each cell reuses the
/// full-data split banks, frames and PSDs, so only injection-specific jobs
/// are new.
pub fn build_injection_sets(
    builder: &mut JobGraphBuilder<'_>,
    settings: &WorkflowSettings,
    shared: &SharedProducts,
    ctx: &mut BuildContext,
) -> Result<Vec<InjectionSet>> {
    if settings.injection_tags.is_empty() {
        return Ok(Vec::new());
    }

    let expander = TagExpander::new(INJECTIONS_SECTION);
    let generator = stages::injections();
    let optimal_snr = stages::optimal_snr();
    let inj_cut = stages::inj_cut();
    let strip = stages::strip_injections();
    let factories: [&dyn StageFactory; 3] = [&optimal_snr, &inj_cut, &strip];
    let chain: Vec<ConditionalStage<'_>> = INJECTION_OPTIONS
        .iter()
        .zip(factories)
        .map(|(&(option, _), factory)| ConditionalStage { option, factory })
        .collect();

    let mut sets = Vec::with_capacity(settings.injection_tags.len());
    for tag in &settings.injection_tags {
        let generated = builder.run_stage(&generator, &[], std::slice::from_ref(tag))?;
        let [generated] = generated.as_slice() else {
            return Err(CoincflowError::GraphError(format!(
                "injection generation for '{tag}' must produce exactly one file, got {}",
                generated.len()
            )));
        };
        let outcome = expander.apply_chain(builder, *generated, tag, &chain)?;
        sets.push(InjectionSet {
            tag: tag.clone(),
            injection_file: outcome.artifact,
            steps: outcome.steps,
        });
    }

    // Per-detector slices of the shared inputs, resolved before the
    // builder is borrowed for the expansion.
    let active = builder.analyzable().active_detectors();
    let detectors = Axis::new("detector", active.iter());
    let tags = Axis::new("injection", settings.injection_tags.iter().cloned());
    let mut per_detector: BTreeMap<String, Vec<ArtifactId>> = BTreeMap::new();
    for det in detectors.values() {
        let mut inputs = Vec::new();
        for id in shared.filter_inputs() {
            if builder.artifact(id)?.applies_to(det) {
                inputs.push(id);
            }
        }
        per_detector.insert(det.clone(), inputs);
    }
    let injection_files: BTreeMap<&str, ArtifactId> = sets
        .iter()
        .map(|s| (s.tag.as_str(), s.injection_file))
        .collect();

    info!(
        cells = cardinality(&[detectors.clone(), tags.clone()]),
        "expanding injection filtering over detector × tag"
    );
    let triggers = expander.expand_cells(
        builder,
        &stages::inspiral(),
        &detectors,
        &tags,
        |det, tag| {
            let mut inputs = per_detector.get(det).cloned().unwrap_or_default();
            let file = injection_files.get(tag).ok_or_else(|| {
                CoincflowError::GraphError(format!("no injection file for tag '{tag}'"))
            })?;
            inputs.push(*file);
            Ok(inputs)
        },
    )?;

    for set in &sets {
        let set_tags: Vec<Tag> = vec![set.tag.clone()];
        let mut own = Vec::new();
        for id in &triggers {
            if builder.artifact(*id)?.tags().first() == Some(&set.tag) {
                own.push(*id);
            }
        }

        let merged = builder.run_stage(&stages::trigger_merge(), &own, &set_tags)?;

        let mut coinc_inputs = merged;
        coinc_inputs.push(shared.template_bank);
        coinc_inputs.push(shared.segments);
        let mut coinc_tags = set_tags.clone();
        coinc_tags.extend(shared.final_tier.iter().cloned());
        let coinc = builder.run_stage(&stages::coinc(), &coinc_inputs, &coinc_tags)?;

        let mut found_inputs = vec![set.injection_file];
        found_inputs.extend(coinc);
        let found = builder.run_stage(&stages::injfind(), &found_inputs, &set_tags)?;
        classify(builder, ctx, &found, ResultSection::Injections)?;

        let sensitivity = builder.run_stage(&stages::plot_sensitivity(), &found, &set_tags)?;
        classify(builder, ctx, &sensitivity, ResultSection::SearchSensitivity)?;

        info!(tag = %set.tag, "built injection set");
    }

    Ok(sets)
}
