// src/pipeline/context.rs

use std::path::{Path, PathBuf};

use crate::artifact::{ArtifactName, ReportIndex, ResultsLayout};
use crate::segments::{Segment, SegmentDocument};
use crate::types::DetectorSet;

/// Explicit state threaded through every build step: where outputs go, the
/// results layout, and what has been classified for presentation.
///
/// Nothing in the graph code reads this; it only flows from the pipeline
/// steps to emission.
#[derive(Debug, Clone)]
pub struct BuildContext {
    name: String,
    output_dir: PathBuf,
    pub layout: ResultsLayout,
    pub report: ReportIndex,
    /// Segment document written alongside the workflow, and its path.
    pub segment_output: Option<(PathBuf, SegmentDocument)>,
    /// Where the resolved configuration is dumped.
    pub config_output: Option<PathBuf>,
}

impl BuildContext {
    pub fn new(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            name: name.into(),
            layout: ResultsLayout::new(output_dir.join("results")),
            output_dir,
            report: ReportIndex::new(),
            segment_output: None,
            config_output: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Location of a planner-written file, following the artifact naming
    /// convention.
    pub fn planned_path(
        &self,
        detectors: &DetectorSet,
        description: &str,
        span: &Segment,
        extension: &str,
    ) -> PathBuf {
        self.output_dir
            .join(ArtifactName::new(detectors, description, span, extension).to_string())
    }

    /// Path of the emitted workflow document.
    pub fn workflow_document_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.name))
    }
}
