// src/pipeline/preflight.rs

//! Checks run before the first job is planned.

use crate::config::settings::INJECTIONS_SECTION;
use crate::config::{ConfigFile, WorkflowSettings};
use crate::errors::{CoincflowError, Result};
use crate::pipeline::analysis::FULL_DATA;
use crate::stages::{CORE_STAGES, INJ_CUT, INJECTION_STAGES, OPTIMAL_SNR, STRIP_INJECTIONS};

/// Per-tag options in `[workflow-injections-{tag}]` and the optional stage
/// each one switches on, in chain order.
pub const INJECTION_OPTIONS: &[(&str, &str)] = &[
    ("compute-optimal-snr", OPTIMAL_SNR),
    ("inj-cut", INJ_CUT),
    ("strip-injections", STRIP_INJECTIONS),
];

/// Every stage this configuration will run must have a config section.
pub fn check_stage_sections(cfg: &ConfigFile, settings: &WorkflowSettings) -> Result<()> {
    let mut required: Vec<&str> = CORE_STAGES.to_vec();

    if !settings.injection_tags.is_empty() {
        required.extend_from_slice(INJECTION_STAGES);
    }
    for tag in &settings.injection_tags {
        for &(option, stage) in INJECTION_OPTIONS {
            if cfg.has_option_tags(INJECTIONS_SECTION, option, std::slice::from_ref(tag))
                && !required.contains(&stage)
            {
                required.push(stage);
            }
        }
    }

    let missing: Vec<&str> = required
        .into_iter()
        .filter(|stage| !cfg.has_section(stage))
        .collect();
    if !missing.is_empty() {
        return Err(CoincflowError::ConfigError(format!(
            "missing stage configuration section(s): {}",
            missing
                .iter()
                .map(|s| format!("[{s}]"))
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    Ok(())
}

/// Injection tags share job tag slots with the full-data and veto-tier
/// tags, so none of them may reuse one.
pub fn check_injection_tags(settings: &WorkflowSettings) -> Result<()> {
    let tiers = settings.tier_tags();
    for tag in &settings.injection_tags {
        if tag == FULL_DATA || tiers.contains(tag) {
            return Err(CoincflowError::ConfigError(format!(
                "[{INJECTIONS_SECTION}-{tag}] uses the reserved tag '{tag}'"
            )));
        }
    }
    Ok(())
}
