// tests/tag_expansion.rs

use std::collections::HashSet;

use pretty_assertions::assert_eq;

use coincflow::artifact::ArtifactKey;
use coincflow::config::settings::INJECTIONS_SECTION;
use coincflow::errors::CoincflowError;
use coincflow::expand::{
    Axis, ConditionalStage, StepResolution, TagExpander, cardinality, cartesian,
};
use coincflow::graph::{JobGraphBuilder, Workflow};
use coincflow::stages;
use coincflow::types::{DetectorSet, Tag};
use coincflow_test_utils::builders::{ConfigBuilder, pipeline_config, seg, segdict};
use coincflow_test_utils::fake_stage::FanOutStage;

fn workflow() -> Workflow {
    Workflow::new("analysis", seg(0, 1000), DetectorSet::new(["H1", "L1"]), "/out")
}

fn tag(t: &str) -> Vec<Tag> {
    vec![t.to_string()]
}

#[test]
fn cartesian_product_varies_last_axis_fastest() {
    let dets = Axis::new("detector", ["H1", "L1"]);
    let tags = Axis::new("injection", ["bns", "nsbh", "bbh"]);
    let axes = [dets, tags];

    let cells: Vec<Vec<&str>> = cartesian(&axes).map(|c| c.values()).collect();
    assert_eq!(cardinality(&axes), 6);
    assert_eq!(
        cells,
        vec![
            vec!["H1", "bns"],
            vec!["H1", "nsbh"],
            vec!["H1", "bbh"],
            vec!["L1", "bns"],
            vec!["L1", "nsbh"],
            vec!["L1", "bbh"],
        ]
    );
}

#[test]
fn empty_axis_yields_no_cells_and_duplicates_collapse() {
    let axes = [Axis::new("detector", ["H1", "H1", "L1"]), Axis::new("injection", Vec::<String>::new())];
    assert_eq!(axes[0].len(), 2);
    assert_eq!(cardinality(&axes), 0);
    assert_eq!(cartesian(&axes).count(), 0);
    assert_eq!(cardinality(&[]), 1);
}

#[test]
fn two_detectors_by_three_tags_makes_six_jobs() {
    let config = pipeline_config().build();
    let analyzable = segdict(&[("H1", &[(0, 1000)]), ("L1", &[(0, 1000)])]);
    let mut builder = JobGraphBuilder::new(workflow(), &config, analyzable);
    let expander = TagExpander::new(INJECTIONS_SECTION);

    let dets = Axis::new("detector", ["H1", "L1"]);
    let tags = Axis::new("injection", ["bns", "nsbh", "bbh"]);
    let mut seen = Vec::new();
    let outputs = expander
        .expand_cells(&mut builder, &stages::datafind(), &dets, &tags, |det, tag| {
            seen.push(format!("{det}/{tag}"));
            Ok(Vec::new())
        })
        .unwrap();

    assert_eq!(seen.len(), 6);
    assert_eq!(outputs.len(), 6);
    let workflow = builder.finish().unwrap();
    assert_eq!(workflow.jobs_in_stage(stages::DATAFIND).count(), 6);

    let keys: HashSet<ArtifactKey> = outputs
        .iter()
        .map(|id| workflow.artifact(*id).unwrap().key().clone())
        .collect();
    assert_eq!(keys.len(), 6);
}

#[test]
fn distinct_tags_on_one_stage_never_collide() {
    let config = pipeline_config().build();
    let mut builder = JobGraphBuilder::new(workflow(), &config, segdict(&[]));

    let a = builder.run_stage(&stages::injections(), &[], &tag("bns")).unwrap();
    let b = builder.run_stage(&stages::injections(), &[], &tag("bbh")).unwrap();

    let ka = builder.artifact(a[0]).unwrap();
    let kb = builder.artifact(b[0]).unwrap();
    assert_ne!(ka.key(), kb.key());
    assert_ne!(ka.locator(), kb.locator());
}

fn chain_config(flags: &[&str]) -> coincflow::config::ConfigFile {
    pipeline_config().with_injection_set("bns", flags).build()
}

#[test]
fn absent_inj_cut_forwards_previous_artifact_with_its_producer() {
    let config = chain_config(&["compute-optimal-snr"]);
    let mut builder = JobGraphBuilder::new(workflow(), &config, segdict(&[]));
    let expander = TagExpander::new(INJECTIONS_SECTION);
    let (snr, cut, strip) = (stages::optimal_snr(), stages::inj_cut(), stages::strip_injections());
    let chain = [
        ConditionalStage { option: "compute-optimal-snr", factory: &snr },
        ConditionalStage { option: "inj-cut", factory: &cut },
        ConditionalStage { option: "strip-injections", factory: &strip },
    ];

    let generated = builder.run_stage(&stages::injections(), &[], &tag("bns")).unwrap()[0];
    let outcome = expander.apply_chain(&mut builder, generated, "bns", &chain).unwrap();

    let snr_artifact = match &outcome.steps[0] {
        StepResolution::Applied { stage, artifact, .. } => {
            assert_eq!(stage, stages::OPTIMAL_SNR);
            *artifact
        }
        other => panic!("expected optimal_snr to run, got {other:?}"),
    };
    assert_eq!(
        outcome.steps[1],
        StepResolution::Forwarded { option: "inj-cut", artifact: snr_artifact }
    );
    assert_eq!(outcome.artifact, snr_artifact);

    let found = builder
        .run_stage(&stages::injfind(), &[outcome.artifact], &tag("bns"))
        .unwrap();
    let workflow = builder.finish().unwrap();

    let injfind_job = workflow.producer_job(found[0]).unwrap();
    let parents = workflow.parents_of(injfind_job);
    assert_eq!(parents.len(), 1);
    assert_eq!(workflow.job(parents[0]).unwrap().stage(), stages::OPTIMAL_SNR);
    assert_eq!(workflow.jobs_in_stage(stages::INJ_CUT).count(), 0);
}

#[test]
fn chain_with_no_options_hands_back_the_generated_file() {
    let config = chain_config(&[]);
    let mut builder = JobGraphBuilder::new(workflow(), &config, segdict(&[]));
    let expander = TagExpander::new(INJECTIONS_SECTION);
    let cut = stages::inj_cut();
    let chain = [ConditionalStage { option: "inj-cut", factory: &cut }];

    let generated = builder.run_stage(&stages::injections(), &[], &tag("bns")).unwrap()[0];
    let outcome = expander.apply_chain(&mut builder, generated, "bns", &chain).unwrap();

    assert_eq!(outcome.artifact, generated);
    let producer = builder.workflow().producer_job(outcome.artifact).unwrap();
    assert_eq!(
        builder.workflow().job(producer).unwrap().stage(),
        stages::INJECTIONS
    );
}

#[test]
fn untagged_section_enables_an_option_for_every_tag() {
    let config = ConfigBuilder::new()
        .with_option(INJECTIONS_SECTION, "inj-cut", "")
        .with_option("workflow-injections-bns", "strip-injections", "")
        .build();
    let expander = TagExpander::new(INJECTIONS_SECTION);

    assert!(expander.is_enabled(&config, "inj-cut", "bns"));
    assert!(expander.is_enabled(&config, "inj-cut", "bbh"));
    assert!(expander.is_enabled(&config, "strip-injections", "bns"));
    assert!(!expander.is_enabled(&config, "strip-injections", "bbh"));
}

#[test]
fn optional_stage_with_several_outputs_is_rejected() {
    let config = chain_config(&["inj-cut"]);
    let mut builder = JobGraphBuilder::new(workflow(), &config, segdict(&[]));
    let expander = TagExpander::new(INJECTIONS_SECTION);
    let fan_out = FanOutStage::new("inj_cut", 2);
    let chain = [ConditionalStage { option: "inj-cut", factory: &fan_out }];

    let generated = builder.run_stage(&stages::injections(), &[], &tag("bns")).unwrap()[0];
    let err = expander
        .apply_chain(&mut builder, generated, "bns", &chain)
        .unwrap_err();
    assert!(matches!(err, CoincflowError::GraphError(_)));
}
