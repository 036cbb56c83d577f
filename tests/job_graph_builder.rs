// tests/job_graph_builder.rs

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use pretty_assertions::assert_eq;

use coincflow::artifact::{ArtifactId, ArtifactKey, OutputSpec};
use coincflow::config::ConfigFile;
use coincflow::errors::{CoincflowError, Result};
use coincflow::graph::{
    ExternalArtifact, JobDraft, JobGraphBuilder, JobId, StageFactory, StageRequest, Workflow,
};
use coincflow::segments::SegmentListDict;
use coincflow::stages;
use coincflow::types::{DetectorSet, Tag};
use coincflow_test_utils::builders::{pipeline_config, seg, segdict};
use coincflow_test_utils::fake_stage::CountingStage;
use coincflow_test_utils::init_tracing;

fn workflow() -> Workflow {
    Workflow::new(
        "analysis",
        seg(1000, 5000),
        DetectorSet::new(["H1", "L1"]),
        "/out",
    )
}

fn analyzable() -> SegmentListDict {
    segdict(&[("H1", &[(1000, 5000)]), ("L1", &[(1000, 3000)])])
}

fn bank(builder: &mut JobGraphBuilder<'_>) -> ArtifactId {
    builder
        .register_external(ExternalArtifact {
            stage: stages::TMPLTBANK.to_string(),
            name: "BANK".to_string(),
            tags: vec![],
            detectors: DetectorSet::new(["H1", "L1"]),
            segment: seg(1000, 5000),
            locator: PathBuf::from("/banks/H1L1-BANK-1000-4000.hdf"),
            metadata: BTreeMap::new(),
        })
        .unwrap()
}

fn tags(values: &[&str]) -> Vec<Tag> {
    values.iter().map(|s| s.to_string()).collect()
}

fn keys(builder: &JobGraphBuilder<'_>, ids: &[ArtifactId]) -> Vec<ArtifactKey> {
    ids.iter()
        .map(|id| builder.artifact(*id).unwrap().key().clone())
        .collect()
}

/// datafind -> psd -> split -> inspiral -> merge, returning every key made.
fn build_chain(config: &ConfigFile) -> Vec<ArtifactKey> {
    let mut builder = JobGraphBuilder::new(workflow(), config, analyzable());
    let full = tags(&["full_data"]);
    let bank = bank(&mut builder);

    let datafind = builder.run_stage(&stages::datafind(), &[], &[]).unwrap();
    let psds = builder.run_stage(&stages::calculate_psd(), &datafind, &[]).unwrap();
    let split = builder.run_stage(&stages::splitbank(2), &[bank], &[]).unwrap();
    let mut inputs = split.clone();
    inputs.extend(&datafind);
    inputs.extend(&psds);
    let triggers = builder.run_stage(&stages::inspiral(), &inputs, &full).unwrap();
    let merged = builder.run_stage(&stages::trigger_merge(), &triggers, &full).unwrap();

    let mut all = Vec::new();
    for ids in [&datafind, &psds, &split, &triggers, &merged] {
        all.extend(keys(&builder, ids));
    }
    all
}

#[test]
fn repeated_construction_yields_identical_keys() {
    init_tracing();
    let config = pipeline_config().build();

    let first = build_chain(&config);
    let second = build_chain(&config);

    assert_eq!(first, second);
    assert_eq!(first.len(), 2 + 2 + 2 + 4 + 2);
}

#[test]
fn shared_ancestors_are_planned_once() {
    let config = pipeline_config().build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());
    let datafind = CountingStage::new(stages::datafind());

    let first = builder.run_stage(&datafind, &[], &[]).unwrap();
    let second = builder.run_stage(&datafind, &[], &[]).unwrap();
    assert_eq!(first, second);
    assert_eq!(datafind.calls(), 1);
    assert_eq!(builder.workflow().jobs().len(), 2);

    // A different tag is a different invocation.
    builder.run_stage(&datafind, &[], &tags(&["bnsinj"])).unwrap();
    assert_eq!(datafind.calls(), 2);
    assert_eq!(builder.workflow().jobs().len(), 4);
}

#[test]
fn bank_split_under_two_tags_gives_eight_distinct_artifacts() {
    let config = pipeline_config().build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());
    let bank = bank(&mut builder);

    let mut split = builder
        .run_stage(&stages::splitbank(4), &[bank], &tags(&["full_data"]))
        .unwrap();
    split.extend(
        builder
            .run_stage(&stages::splitbank(4), &[bank], &tags(&["injections"]))
            .unwrap(),
    );

    assert_eq!(split.len(), 8);
    let unique_keys: HashSet<ArtifactKey> = keys(&builder, &split).into_iter().collect();
    assert_eq!(unique_keys.len(), 8);
    let locators: HashSet<PathBuf> = split
        .iter()
        .map(|id| builder.artifact(*id).unwrap().locator().to_path_buf())
        .collect();
    assert_eq!(locators.len(), 8);

    let third = builder.artifact(split[2]).unwrap();
    assert_eq!(third.tags(), &tags(&["full_data", "bank2"])[..]);
    assert_eq!(third.meta("split-index"), Some("2"));
    assert_eq!(third.meta("num-splits"), Some("4"));
    assert_eq!(
        third.locator(),
        PathBuf::from("/out/H1L1-SPLITBANK_FULL_DATA_BANK2-1000-4000.hdf")
    );
}

#[test]
fn split_requires_exactly_one_bank() {
    let config = pipeline_config().build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());

    let err = builder.run_stage(&stages::splitbank(2), &[], &[]).unwrap_err();
    assert!(matches!(err, CoincflowError::GraphError(_)));
}

#[test]
fn merge_consumes_every_split_sibling_of_a_detector() {
    let config = pipeline_config().build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());
    let full = tags(&["full_data"]);
    let bank = bank(&mut builder);

    let split = builder.run_stage(&stages::splitbank(3), &[bank], &[]).unwrap();
    let triggers = builder.run_stage(&stages::inspiral(), &split, &full).unwrap();
    assert_eq!(triggers.len(), 6);

    let merged = builder.run_stage(&stages::trigger_merge(), &triggers, &full).unwrap();
    assert_eq!(merged.len(), 2);

    let workflow = builder.finish().unwrap();
    for id in merged {
        let artifact = workflow.artifact(id).unwrap();
        assert_eq!(artifact.meta("sibling-count"), Some("3"));

        let det = artifact.detectors().as_single().unwrap().to_string();
        let merge_job = workflow.producer_job(id).unwrap();
        let parents = workflow.parents_of(merge_job);
        assert_eq!(parents.len(), 3);
        for parent in parents {
            let job = workflow.job(parent).unwrap();
            assert_eq!(job.stage(), stages::INSPIRAL);
            assert_eq!(job.key().detectors.as_single(), Some(det.as_str()));
        }
    }

    // L1 only has analyzable time in [1000, 3000).
    let l1 = workflow
        .jobs_in_stage(stages::TRIGGER_MERGE)
        .find(|j| j.key().detectors.as_single() == Some("L1"))
        .unwrap();
    let out = workflow.artifact(l1.outputs()[0]).unwrap();
    assert_eq!(out.segment(), seg(1000, 3000));
    assert_eq!(out.meta("valid-segments"), Some("{[1000, 3000)}"));
}

#[test]
fn detectors_without_analyzable_time_get_no_job() {
    let config = pipeline_config().build();
    let only_h1 = segdict(&[("H1", &[(1000, 5000)]), ("L1", &[])]);
    let mut builder = JobGraphBuilder::new(workflow(), &config, only_h1);

    let datafind = builder.run_stage(&stages::datafind(), &[], &[]).unwrap();
    assert_eq!(datafind.len(), 1);
    assert_eq!(
        builder.artifact(datafind[0]).unwrap().detectors(),
        &DetectorSet::single("H1")
    );
}

#[test]
fn stage_options_merge_base_tag_and_detector_sections() {
    let config = pipeline_config()
        .with_option("inspiral-full_data", "snr-threshold", "5.5")
        .with_option("inspiral-h1", "approximant", "TaylorF2")
        .build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());
    let bank = bank(&mut builder);
    let split = builder.run_stage(&stages::splitbank(1), &[bank], &[]).unwrap();
    builder
        .run_stage(&stages::inspiral(), &split, &tags(&["full_data"]))
        .unwrap();

    let workflow = builder.finish().unwrap();
    let h1 = workflow
        .jobs_in_stage(stages::INSPIRAL)
        .find(|j| j.key().detectors.as_single() == Some("H1"))
        .unwrap();
    assert_eq!(h1.options().get("approximant").map(String::as_str), Some("TaylorF2"));
    assert_eq!(h1.options().get("channel-name").map(String::as_str), Some("H1:STRAIN"));
    assert_eq!(h1.options().get("snr-threshold").map(String::as_str), Some("5.5"));

    let l1 = workflow
        .jobs_in_stage(stages::INSPIRAL)
        .find(|j| j.key().detectors.as_single() == Some("L1"))
        .unwrap();
    assert_eq!(l1.options().get("approximant").map(String::as_str), Some("SPAtmplt"));
}

#[test]
fn unregistered_input_is_rejected() {
    let config = pipeline_config().build();

    // A handle that only exists in another workflow.
    let mut other = JobGraphBuilder::new(workflow(), &config, analyzable());
    other.run_stage(&stages::datafind(), &[], &[]).unwrap();
    let foreign = other.run_stage(&stages::calculate_psd(), &[], &[]).unwrap();

    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());
    let err = builder
        .run_stage(&stages::plot_spectrum(), &foreign, &[])
        .unwrap_err();
    assert!(matches!(err, CoincflowError::GraphError(_)));
    assert!(builder.workflow().jobs().is_empty());
}

/// Plans the same job twice in one invocation.
struct DuplicateStage;

impl StageFactory for DuplicateStage {
    fn stage(&self) -> &str {
        "duplicate"
    }

    fn plan(&self, request: &StageRequest<'_>) -> Result<Vec<JobDraft>> {
        let draft = |name: &str| {
            JobDraft::new(request.detectors.clone()).output(OutputSpec::new(
                name,
                request.detectors.clone(),
                request.span,
                "dat",
            ))
        };
        Ok(vec![draft("FIRST"), draft("SECOND")])
    }
}

#[test]
fn two_jobs_with_one_identity_collide() {
    let config = pipeline_config().build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());

    let err = builder.run_stage(&DuplicateStage, &[], &[]).unwrap_err();
    assert!(matches!(err, CoincflowError::IdentityCollision(_)));
}

#[test]
fn sealed_workflow_orders_parents_first() {
    let config = pipeline_config().build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());
    let datafind = builder.run_stage(&stages::datafind(), &[], &[]).unwrap();
    let psds = builder.run_stage(&stages::calculate_psd(), &datafind, &[]).unwrap();
    builder.run_stage(&stages::plot_spectrum(), &psds, &[]).unwrap();

    let workflow = builder.finish().unwrap();
    let order = workflow.topological_order().unwrap();
    let position = |id: JobId| order.iter().position(|j| *j == id).unwrap();
    for (parent, child) in workflow.edges() {
        assert!(position(parent) < position(child));
    }

    assert_eq!(workflow.roots().len(), 2);
    assert_eq!(workflow.leaves().len(), 1);
    let spectrum = workflow.leaves()[0];
    assert_eq!(workflow.job(spectrum).unwrap().stage(), stages::PLOT_SPECTRUM);
    assert_eq!(workflow.parents_of(spectrum).len(), 2);
}

#[test]
fn factory_parameters_are_part_of_the_invocation() {
    let config = pipeline_config().build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());
    let bank = bank(&mut builder);

    let two = builder.run_stage(&stages::splitbank(2), &[bank], &[]).unwrap();
    let again = CountingStage::new(stages::splitbank(2));
    assert_eq!(builder.run_stage(&again, &[bank], &[]).unwrap(), two);
    assert_eq!(again.calls(), 0);

    // A different split count is a different plan for the same job.
    let four = CountingStage::new(stages::splitbank(4));
    let err = builder.run_stage(&four, &[bank], &[]).unwrap_err();
    assert_eq!(four.calls(), 1);
    assert!(matches!(err, CoincflowError::IdentityCollision(_)));
}

#[test]
fn planned_options_distinguish_combined_invocations() {
    let config = pipeline_config().build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable());

    let first = CountingStage::new(stages::results_page().with_option("plots-dir", "/a"));
    builder.run_stage(&first, &[], &[]).unwrap();
    builder.run_stage(&first, &[], &[]).unwrap();
    assert_eq!(first.calls(), 1);

    let second = CountingStage::new(stages::results_page().with_option("plots-dir", "/b"));
    assert!(builder.run_stage(&second, &[], &[]).is_err());
    assert_eq!(second.calls(), 1);
}
