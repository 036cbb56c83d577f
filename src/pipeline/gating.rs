// src/pipeline/gating.rs

use std::path::PathBuf;

use tracing::info;

use crate::config::settings::GATING_SECTION;
use crate::config::{ConfigFile, tagged_section};
use crate::stages::{CALCULATE_PSD, INSPIRAL};
use crate::types::DetectorSet;

pub const GATING_OPTION: &str = "gating-file";

/// A per-detector gating file picked up from `[workflow-gating-{ifo}]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatingFile {
    pub detector: String,
    pub path: PathBuf,
}

/// Point every PSD and matched-filter job of a gated detector at its gating
/// file, creating the detector's stage subsections when they don't exist.
///
/// Runs before graph construction; the returned files become external
/// artifacts of the analysis workflow.
pub fn attach_gating(cfg: &mut ConfigFile, detectors: &DetectorSet) -> Vec<GatingFile> {
    let mut attached = Vec::new();

    for det in detectors.iter() {
        let Some(raw) = cfg.get(&tagged_section(GATING_SECTION, det), GATING_OPTION) else {
            continue;
        };
        let path = cfg.resolve_path(raw);
        let value = path.display().to_string();

        for stage in [CALCULATE_PSD, INSPIRAL] {
            cfg.get_or_create_section(&tagged_section(stage, det))
                .insert(GATING_OPTION.to_string(), value.clone());
        }

        info!(detector = det, path = %value, "attached gating file");
        attached.push(GatingFile {
            detector: det.to_string(),
            path,
        });
    }

    attached
}
