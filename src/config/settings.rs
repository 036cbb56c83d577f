// src/config/settings.rs

use crate::config::model::ConfigFile;
use crate::errors::{CoincflowError, Result};
use crate::segments::{GpsSeconds, Segment, cumulative_tier_name};
use crate::types::{DetectorSet, Tag};

pub const WORKFLOW_SECTION: &str = "workflow";
pub const SEGMENTS_SECTION: &str = "workflow-segments";
pub const SPLITTABLE_SECTION: &str = "workflow-splittable";
pub const INJECTIONS_SECTION: &str = "workflow-injections";
pub const GATING_SECTION: &str = "workflow-gating";

/// Typed view of the workflow-level options.
///
/// ```toml
/// [workflow]
/// start-time = 1000
/// end-time = 5000
/// ifos = ["H1", "L1"]
///
/// [workflow-segments]
/// segments-file = "segments.json"
/// segments-science = "DATA"
/// segments-veto-categories = ["CAT1", "CAT2", "CAT3"]
/// segments-science-veto = ["CAT1"]
///
/// [workflow-splittable]
/// splittable-num-banks = 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub span: Segment,
    pub detectors: DetectorSet,
    pub segments_file: String,
    pub science_name: String,
    /// Ordered by increasing severity.
    pub veto_categories: Vec<String>,
    /// Categories removed from science time before any job sees it.
    pub science_vetoes: Vec<String>,
    pub num_banks: usize,
    pub injection_tags: Vec<Tag>,
}

impl WorkflowSettings {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let start = required_parsed::<GpsSeconds>(cfg, WORKFLOW_SECTION, "start-time")?;
        let end = required_parsed::<GpsSeconds>(cfg, WORKFLOW_SECTION, "end-time")?;
        if end <= start {
            return Err(CoincflowError::ConfigError(format!(
                "[{WORKFLOW_SECTION}] end-time {end} must be after start-time {start}"
            )));
        }
        let span = Segment::new(start, end)?;

        let detectors = DetectorSet::new(cfg.list(WORKFLOW_SECTION, "ifos"));
        if detectors.is_empty() {
            return Err(CoincflowError::ConfigError(format!(
                "[{WORKFLOW_SECTION}] ifos must name at least one detector"
            )));
        }

        let segments_file = cfg.require(SEGMENTS_SECTION, "segments-file")?.to_string();
        let science_name = cfg
            .require(SEGMENTS_SECTION, "segments-science")?
            .to_string();
        let veto_categories = cfg.list(SEGMENTS_SECTION, "segments-veto-categories");
        let science_vetoes = cfg.list(SEGMENTS_SECTION, "segments-science-veto");

        let num_banks = cfg
            .get_parsed::<usize>(SPLITTABLE_SECTION, "splittable-num-banks")?
            .unwrap_or(1);

        Ok(Self {
            span,
            detectors,
            segments_file,
            science_name,
            veto_categories,
            science_vetoes,
            num_banks,
            injection_tags: cfg.subsection_tags(INJECTIONS_SECTION),
        })
    }

    /// Categories applied as cumulative tiers, most permissive first: the
    /// declared categories minus the science vetoes.
    pub fn veto_ladder(&self) -> Vec<String> {
        self.veto_categories
            .iter()
            .filter(|c| !self.science_vetoes.contains(c))
            .cloned()
            .collect()
    }

    /// Lower-cased tier names as they appear in job tags.
    pub fn tier_tags(&self) -> Vec<Tag> {
        let ladder = self.veto_ladder();
        (1..=ladder.len())
            .map(|n| cumulative_tier_name(&ladder[..n]).to_lowercase())
            .collect()
    }
}

fn required_parsed<T>(cfg: &ConfigFile, section: &str, option: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    cfg.get_parsed::<T>(section, option)?.ok_or_else(|| {
        CoincflowError::ConfigError(format!("missing option '{option}' in [{section}]"))
    })
}
