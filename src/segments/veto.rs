// src/segments/veto.rs

//! Veto categories and the analyzable-time derivations built on them.

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::{CoincflowError, Result};
use crate::segments::dict::SegmentListDict;
use crate::segments::document::SegmentDocument;
use crate::types::DetectorSet;

/// Prefix of every cumulative tier name.
pub const CUMULATIVE_PREFIX: &str = "CUMULATIVE_";

/// Named veto categories, each holding per-detector veto time.
///
/// A category that was never loaded is an error on lookup, which keeps
/// "no vetoes" (an empty list) distinct from "misconfigured veto".
#[derive(Debug, Clone, Default)]
pub struct VetoSource {
    categories: BTreeMap<String, SegmentListDict>,
}

/// One rung of the cumulative veto ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VetoTier {
    /// `CUMULATIVE_{CAT1}_{CAT2}...`: the categories applied so far.
    pub name: String,
    pub categories: Vec<String>,
    pub segments: SegmentListDict,
}

impl VetoSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, vetoes: SegmentListDict) {
        self.categories.insert(category.into(), vetoes);
    }

    /// Load each category for each detector from a segment document.
    ///
    /// Every `"{detector}:{category}"` key must be present; an empty list is
    /// fine, a missing key fails with [`CoincflowError::MissingVetoCategory`].
    pub fn from_document(
        doc: &SegmentDocument,
        categories: &[String],
        detectors: &DetectorSet,
    ) -> Result<Self> {
        let mut source = VetoSource::new();
        for category in categories {
            let mut dict = SegmentListDict::new();
            for det in detectors.iter() {
                let list = doc.get(det, category).ok_or_else(|| {
                    CoincflowError::MissingVetoCategory {
                        detector: det.to_string(),
                        category: category.clone(),
                    }
                })?;
                dict.insert(det, list.clone());
            }
            source.insert(category.clone(), dict);
        }
        Ok(source)
    }

    pub fn category(&self, name: &str) -> Result<&SegmentListDict> {
        self.categories
            .get(name)
            .ok_or_else(|| CoincflowError::MissingVetoCategory {
                detector: "*".to_string(),
                category: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(|s| s.as_str())
    }
}

/// Science time minus the union of the in-workflow veto categories.
///
/// Neither input is modified.
pub fn compute_analyzable(
    science: &SegmentListDict,
    vetoes: &VetoSource,
    in_workflow: &[String],
) -> Result<SegmentListDict> {
    let mut vetoed = SegmentListDict::new();
    for category in in_workflow {
        vetoed = vetoed.union(vetoes.category(category)?);
    }

    let analyzable = science.difference(&vetoed);
    for (det, list) in analyzable.iter() {
        debug!(
            detector = det,
            livetime = list.total_duration(),
            segments = list.len(),
            "analyzable time"
        );
    }
    Ok(analyzable)
}

/// Progressively subtract each category, most permissive tier first.
///
/// `ordered` lists the categories by increasing severity. Tier `i` is tier
/// `i - 1` with category `i` removed; tier 0 is `base` minus the first
/// category.
pub fn compute_cumulative_veto_groups(
    base: &SegmentListDict,
    vetoes: &VetoSource,
    ordered: &[String],
) -> Result<Vec<VetoTier>> {
    let mut tiers: Vec<VetoTier> = Vec::with_capacity(ordered.len());
    let mut current = base.clone();
    let mut applied: Vec<String> = Vec::new();

    for category in ordered {
        current = current.difference(vetoes.category(category)?);
        applied.push(category.clone());
        tiers.push(VetoTier {
            name: cumulative_tier_name(&applied),
            categories: applied.clone(),
            segments: current.clone(),
        });
    }

    verify_veto_ladder(base, &tiers)?;
    Ok(tiers)
}

/// Check that every tier is contained in the one before it (and the first
/// in `base`).
pub fn verify_veto_ladder(base: &SegmentListDict, tiers: &[VetoTier]) -> Result<()> {
    let mut previous = base;
    let mut previous_name = "base";
    for tier in tiers {
        if !tier.segments.is_subset_of(previous) {
            return Err(CoincflowError::SegmentAlgebra(format!(
                "veto tier {} is not contained in {}",
                tier.name, previous_name
            )));
        }
        previous = &tier.segments;
        previous_name = &tier.name;
    }
    Ok(())
}

/// Name of the tier reached after applying `categories` in order.
pub fn cumulative_tier_name(categories: &[String]) -> String {
    let upper: Vec<String> = categories.iter().map(|c| c.to_uppercase()).collect();
    format!("{CUMULATIVE_PREFIX}{}", upper.join("_"))
}
