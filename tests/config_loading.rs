// tests/config_loading.rs

use std::io::Write;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use coincflow::config::{ConfigFile, WorkflowSettings, load_and_validate, validate_config};
use coincflow::errors::CoincflowError;
use coincflow::types::DetectorSet;
use coincflow_test_utils::builders::{ConfigBuilder, pipeline_config, seg};

const CONFIG: &str = r#"
[workflow]
start-time = 1000
end-time = 5000
ifos = ["L1", "H1"]

[workflow-segments]
segments-file = "segments.json"
segments-science = "DATA"
segments-veto-categories = ["CAT1", "CAT2"]
segments-science-veto = ["CAT1"]

[workflow-splittable]
splittable-num-banks = 4

[workflow-injections-BNSINJ]
compute-optimal-snr = ""

[workflow-injections-nsbhinj]

[inspiral]
low-frequency-cutoff = 20.5
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn loads_settings_from_toml() {
    let file = write_config(CONFIG);
    let cfg = load_and_validate(file.path()).unwrap();
    let settings = WorkflowSettings::from_config(&cfg).unwrap();

    assert_eq!(settings.span, seg(1000, 5000));
    assert_eq!(settings.detectors, DetectorSet::new(["H1", "L1"]));
    assert_eq!(settings.veto_categories, vec!["CAT1", "CAT2"]);
    assert_eq!(settings.science_vetoes, vec!["CAT1"]);
    assert_eq!(settings.num_banks, 4);
    // Section names are lower-cased on load.
    assert_eq!(settings.injection_tags, vec!["bnsinj", "nsbhinj"]);
    assert_eq!(cfg.get("inspiral", "low-frequency-cutoff"), Some("20.5"));
}

#[test]
fn relative_paths_resolve_against_the_config_directory() {
    let file = write_config(CONFIG);
    let cfg = load_and_validate(file.path()).unwrap();

    let dir = file.path().parent().unwrap();
    assert_eq!(cfg.resolve_path("segments.json"), dir.join("segments.json"));
    assert_eq!(cfg.resolve_path("/abs/segments.json"), Path::new("/abs/segments.json"));
}

#[test]
fn config_given_by_relative_path_yields_absolute_locators() {
    let dir = tempfile::tempdir_in(".").unwrap();
    let path = dir.path().join("coincflow.toml");
    assert!(path.is_relative());
    std::fs::write(&path, CONFIG).unwrap();

    let cfg = load_and_validate(&path).unwrap();
    let resolved = cfg.resolve_path("banks/bank.hdf");
    assert!(resolved.is_absolute());
    assert!(resolved.ends_with(Path::new(dir.path().file_name().unwrap()).join("banks/bank.hdf")));
}

#[test]
fn tag_scoped_lookup_prefers_the_tagged_section() {
    let cfg = ConfigBuilder::new()
        .with_option("workflow-injections", "inj-cut", "base")
        .with_option("workflow-injections-bnsinj", "inj-cut", "tagged")
        .build();

    let bns = vec!["BNSINJ".to_string()];
    let other = vec!["bbhinj".to_string()];
    assert_eq!(cfg.get_option_tags("workflow-injections", "inj-cut", &bns), Some("tagged"));
    assert_eq!(cfg.get_option_tags("workflow-injections", "inj-cut", &other), Some("base"));
    assert!(!cfg.has_option_tags("workflow-injections", "strip-injections", &bns));
}

#[test]
fn get_or_create_section_is_idempotent() {
    let mut cfg = ConfigFile::default();
    assert!(!cfg.has_section("inspiral-h1"));

    cfg.get_or_create_section("inspiral-H1")
        .insert("gating-file".to_string(), "/gates/h1.txt".to_string());
    cfg.get_or_create_section("inspiral-h1")
        .insert("channel-name".to_string(), "H1:STRAIN".to_string());

    let section = cfg.section("inspiral-h1").unwrap();
    assert_eq!(section.len(), 2);
    assert_eq!(cfg.get("inspiral-h1", "gating-file"), Some("/gates/h1.txt"));
}

#[test]
fn overrides_create_sections_and_keep_colons_in_values() {
    let mut cfg = pipeline_config().build();
    cfg.apply_override("inspiral-h1:channel-name:H1:GDS-CALIB_STRAIN").unwrap();
    cfg.apply_override("workflow-injections-bbhinj:inj-cut").unwrap();
    cfg.apply_override("workflow-splittable:splittable-num-banks:8").unwrap();

    assert_eq!(cfg.get("inspiral-h1", "channel-name"), Some("H1:GDS-CALIB_STRAIN"));
    assert_eq!(cfg.get("workflow-injections-bbhinj", "inj-cut"), Some(""));
    let settings = WorkflowSettings::from_config(&cfg).unwrap();
    assert_eq!(settings.num_banks, 8);
    assert_eq!(settings.injection_tags, vec!["bbhinj"]);

    assert!(matches!(
        cfg.apply_override("no-option-here"),
        Err(CoincflowError::ConfigError(_))
    ));
}

#[test]
fn stage_options_layer_tag_and_detector_sections() {
    let cfg = ConfigBuilder::new()
        .with_option("coinc", "threshold", "1")
        .with_option("coinc", "method", "exact")
        .with_option("coinc-full_data", "threshold", "2")
        .with_option("coinc-h1", "threshold", "3")
        .build();

    let merged = cfg.options_for("coinc", &["full_data".to_string()]);
    assert_eq!(merged.get("threshold").map(String::as_str), Some("2"));
    assert_eq!(merged.get("method").map(String::as_str), Some("exact"));

    let merged = cfg.options_for("coinc", &["full_data".to_string(), "H1".to_string()]);
    assert_eq!(merged.get("threshold").map(String::as_str), Some("3"));
}

#[test]
fn resolved_configuration_dumps_as_toml() {
    let cfg = pipeline_config().build();
    let dumped = cfg.to_toml_string().unwrap();
    assert!(dumped.contains("[workflow-segments]"));
    assert!(dumped.contains("segments-science = \"DATA\""));
}

fn expect_config_error(builder: ConfigBuilder, needle: &str) {
    match builder.build_validated() {
        Err(CoincflowError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "'{msg}' should mention '{needle}'");
        }
        other => panic!("expected ConfigError mentioning '{needle}', got {other:?}"),
    }
}

#[test]
fn validation_rejects_bad_workflow_settings() {
    expect_config_error(pipeline_config().without_section("workflow-segments"), "[workflow-segments]");
    expect_config_error(pipeline_config().with_option("workflow", "end-time", "500"), "end-time");
    expect_config_error(pipeline_config().with_option("workflow", "ifos", ""), "ifos");
    expect_config_error(
        pipeline_config().with_option("workflow-segments", "segments-science-veto", "CAT9"),
        "CAT9",
    );
    expect_config_error(
        pipeline_config().with_option("workflow-segments", "segments-veto-categories", "CAT1,CAT1"),
        "listed twice",
    );
    expect_config_error(
        pipeline_config().with_option("workflow-splittable", "splittable-num-banks", "0"),
        "splittable-num-banks",
    );
    expect_config_error(
        pipeline_config().with_option("workflow", "start-time", "soon"),
        "start-time",
    );
}

#[test]
fn veto_categories_may_not_shadow_persisted_lists() {
    for reserved in ["SCIENCE", "analyzable", "CUMULATIVE_CAT2"] {
        expect_config_error(
            pipeline_config().with_option(
                "workflow-segments",
                "segments-veto-categories",
                &format!("CAT1,{reserved}"),
            ),
            "reserved",
        );
    }
}

#[test]
fn invalid_toml_file_is_reported() {
    let file = write_config("[workflow\nstart-time = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(CoincflowError::TomlError(_))
    ));
}

#[test]
fn loading_runs_validation() {
    let file = write_config(&CONFIG.replace("end-time = 5000", "end-time = 10"));
    let err = load_and_validate(file.path()).unwrap_err();
    assert!(err.is_configuration());
    assert!(validate_config(&pipeline_config().build()).is_ok());
}
