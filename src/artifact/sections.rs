// src/artifact/sections.rs

//! Results-page layout.
//!
//! Classification is presentation only. It lives in a [`ReportIndex`] held
//! by the build context, never on the artifact or the workflow, so it has
//! no way to influence dependency edges or stage inclusion.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::artifact::artifact::Artifact;
use crate::errors::Result;
use crate::fs::FileSystem;

/// Fixed, ordered taxonomy of results sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSection {
    AnalysisTime,
    DetectorSensitivity,
    SingleTriggers,
    CoincidentTriggers,
    Injections,
    SearchSensitivity,
    OpenBoxResult,
    Workflow,
}

impl ResultSection {
    pub const ALL: [ResultSection; 8] = [
        ResultSection::AnalysisTime,
        ResultSection::DetectorSensitivity,
        ResultSection::SingleTriggers,
        ResultSection::CoincidentTriggers,
        ResultSection::Injections,
        ResultSection::SearchSensitivity,
        ResultSection::OpenBoxResult,
        ResultSection::Workflow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResultSection::AnalysisTime => "analysis_time",
            ResultSection::DetectorSensitivity => "detector_sensitivity",
            ResultSection::SingleTriggers => "single_triggers",
            ResultSection::CoincidentTriggers => "coincident_triggers",
            ResultSection::Injections => "injections",
            ResultSection::SearchSensitivity => "search_sensitivity",
            ResultSection::OpenBoxResult => "open_box_result",
            ResultSection::Workflow => "workflow",
        }
    }

    /// 1-based position in [`ResultSection::ALL`].
    pub fn number(&self) -> usize {
        ResultSection::ALL
            .iter()
            .position(|s| s == self)
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Directory name, e.g. `3._single_triggers`.
    pub fn dir_name(&self) -> String {
        format!("{}._{}", self.number(), self.name())
    }
}

impl fmt::Display for ResultSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Section → directory map under a results root.
#[derive(Debug, Clone)]
pub struct ResultsLayout {
    root: PathBuf,
    sections: BTreeMap<ResultSection, PathBuf>,
}

impl ResultsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let sections = ResultSection::ALL
            .iter()
            .map(|s| (*s, root.join(s.dir_name())))
            .collect();
        Self { root, sections }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, section: ResultSection) -> &Path {
        // Every variant is inserted in `new`.
        self.sections
            .get(&section)
            .map(|p| p.as_path())
            .unwrap_or(self.root.as_path())
    }

    /// Create the root and one subdirectory per section.
    pub fn materialize(&self, fs: &dyn FileSystem) -> Result<()> {
        fs.create_dir_all(&self.root)?;
        for path in self.sections.values() {
            fs.create_dir_all(path)?;
        }
        Ok(())
    }
}

/// One classified, report-worthy file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub label: String,
    pub locator: PathBuf,
    pub section: ResultSection,
}

/// Outcome of symlinking classified files into the results tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    pub linked: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// Classified report entries in registration order.
#[derive(Debug, Clone, Default)]
pub struct ReportIndex {
    entries: Vec<ReportEntry>,
}

impl ReportIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(&mut self, artifact: &Artifact, section: ResultSection) {
        self.classify_path(artifact.key().to_string(), artifact.locator(), section);
    }

    pub fn classify_path(
        &mut self,
        label: impl Into<String>,
        locator: impl Into<PathBuf>,
        section: ResultSection,
    ) {
        self.entries.push(ReportEntry {
            label: label.into(),
            locator: locator.into(),
            section,
        });
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn in_section(&self, section: ResultSection) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.section == section)
    }

    /// Symlink every entry into its section directory.
    ///
    /// Failures never abort: an existing link is logged at debug level,
    /// any other error at warn level, and both are counted.
    pub fn link_all(&self, fs: &dyn FileSystem, layout: &ResultsLayout) -> LinkReport {
        let mut report = LinkReport::default();

        for entry in &self.entries {
            let Some(file_name) = entry.locator.file_name() else {
                warn!(label = %entry.label, "report entry has no file name; skipping");
                report.failed += 1;
                continue;
            };
            let link = layout.path(entry.section).join(file_name);

            match fs.symlink(&entry.locator, &link) {
                Ok(()) => report.linked += 1,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(link = ?link, "results link already exists");
                    report.already_present += 1;
                }
                Err(e) => {
                    warn!(link = ?link, error = %e, "could not link result into section");
                    report.failed += 1;
                }
            }
        }

        report
    }
}
