// src/pipeline/segment_plan.rs

use tracing::{info, warn};

use crate::config::WorkflowSettings;
use crate::errors::Result;
use crate::segments::{
    SegmentDocument, SegmentListDict, VetoSource, VetoTier, compute_analyzable,
    compute_cumulative_veto_groups,
};

pub const SCIENCE_NAME: &str = "SCIENCE";
pub const ANALYZABLE_NAME: &str = "ANALYZABLE";

/// Segment products every later stage builds on.
#[derive(Debug, Clone)]
pub struct SegmentPlan {
    pub science: SegmentListDict,
    pub analyzable: SegmentListDict,
    pub tiers: Vec<VetoTier>,
    /// Everything above, keyed `"{ifo}:{name}"`, ready to persist.
    pub document: SegmentDocument,
}

/// Resolve science time, vetoes and the veto ladder from the input document.
///
/// Any missing list fails here, before a single job exists.
pub fn plan_segments(source: &SegmentDocument, settings: &WorkflowSettings) -> Result<SegmentPlan> {
    let science = source
        .dict_for(&settings.science_name, &settings.detectors)?
        .clip(&settings.span);
    let vetoes = VetoSource::from_document(source, &settings.veto_categories, &settings.detectors)?;

    let analyzable = compute_analyzable(&science, &vetoes, &settings.science_vetoes)?;

    let ladder = settings.veto_ladder();
    let tiers = compute_cumulative_veto_groups(&analyzable, &vetoes, &ladder)?;

    for det in settings.detectors.iter() {
        let livetime = analyzable.get(det).map(|l| l.total_duration()).unwrap_or(0);
        if livetime == 0 {
            warn!(detector = det, "detector has no analyzable time; it will not be analyzed");
        } else {
            info!(detector = det, livetime, "analyzable livetime");
        }
    }

    let mut document = SegmentDocument::new(settings.span);
    document.insert_dict(SCIENCE_NAME, &science);
    document.insert_dict(ANALYZABLE_NAME, &analyzable);
    for category in &settings.veto_categories {
        document.insert_dict(category, vetoes.category(category)?);
    }
    for tier in &tiers {
        document.insert_dict(&tier.name, &tier.segments);
    }

    Ok(SegmentPlan {
        science,
        analyzable,
        tiers,
        document,
    })
}
