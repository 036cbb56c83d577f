// src/config/validate.rs

use crate::config::model::ConfigFile;
use crate::config::settings::{SEGMENTS_SECTION, SPLITTABLE_SECTION, WORKFLOW_SECTION, WorkflowSettings};
use crate::errors::{CoincflowError, Result};
use crate::pipeline::segment_plan::{ANALYZABLE_NAME, SCIENCE_NAME};
use crate::segments::CUMULATIVE_PREFIX;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - the `[workflow]` and `[workflow-segments]` sections exist
/// - the analysis span and detector list parse (`WorkflowSettings`)
/// - every science-veto category is one of the declared veto categories
/// - the declared veto categories are unique and avoid the names the
///   persisted segment document reserves
/// - `splittable-num-banks >= 1`
///
/// It does **not** check that stage sections exist or that segment data is
/// available; the pipeline preflight does that, since it depends on which
/// optional stages the injection tags switch on.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_sections(cfg)?;
    let settings = WorkflowSettings::from_config(cfg)?;
    validate_veto_categories(&settings)?;
    validate_splits(&settings)?;
    Ok(())
}

fn ensure_sections(cfg: &ConfigFile) -> Result<()> {
    for section in [WORKFLOW_SECTION, SEGMENTS_SECTION] {
        if !cfg.has_section(section) {
            return Err(CoincflowError::ConfigError(format!(
                "config must contain a [{section}] section"
            )));
        }
    }
    Ok(())
}

fn validate_veto_categories(settings: &WorkflowSettings) -> Result<()> {
    for (i, category) in settings.veto_categories.iter().enumerate() {
        let upper = category.to_uppercase();
        if upper == SCIENCE_NAME || upper == ANALYZABLE_NAME || upper.starts_with(CUMULATIVE_PREFIX) {
            return Err(CoincflowError::ConfigError(format!(
                "veto category '{category}' clashes with a reserved segment list name"
            )));
        }
        if settings.veto_categories[..i].contains(category) {
            return Err(CoincflowError::ConfigError(format!(
                "veto category '{category}' is listed twice in segments-veto-categories"
            )));
        }
    }
    for category in &settings.science_vetoes {
        if !settings.veto_categories.contains(category) {
            return Err(CoincflowError::ConfigError(format!(
                "segments-science-veto names '{category}', which is not in segments-veto-categories"
            )));
        }
    }
    Ok(())
}

fn validate_splits(settings: &WorkflowSettings) -> Result<()> {
    if settings.num_banks == 0 {
        return Err(CoincflowError::ConfigError(format!(
            "[{SPLITTABLE_SECTION}] splittable-num-banks must be >= 1 (got 0)"
        )));
    }
    Ok(())
}
