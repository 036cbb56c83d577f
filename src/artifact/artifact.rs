// src/artifact/artifact.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::graph::JobId;
use crate::segments::Segment;
use crate::types::{DetectorSet, Tag};

/// Identity of an artifact: `(stage, tags, detectors, name)`.
///
/// Two registrations with the same key must describe the same content;
/// anything else is an internal consistency error.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArtifactKey {
    pub stage: String,
    pub tags: Vec<Tag>,
    pub detectors: DetectorSet,
    pub name: String,
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]@{}/{}",
            self.stage,
            self.tags.join(","),
            self.detectors,
            self.name
        )
    }
}

/// Handle to an artifact registered in a workflow's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ArtifactId(pub(crate) usize);

impl ArtifactId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Who creates an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Producer {
    Job(JobId),
    /// Pre-existing input, or a file written while planning (segment
    /// documents, the config dump).
    External,
}

impl Producer {
    pub fn job(&self) -> Option<JobId> {
        match self {
            Producer::Job(id) => Some(*id),
            Producer::External => None,
        }
    }
}

/// A named, immutable unit of data flowing between jobs.
#[derive(Debug, Clone)]
pub struct Artifact {
    key: ArtifactKey,
    segment: Segment,
    locator: PathBuf,
    metadata: BTreeMap<String, String>,
    producer: Producer,
}

impl Artifact {
    pub fn new(
        key: ArtifactKey,
        segment: Segment,
        locator: PathBuf,
        metadata: BTreeMap<String, String>,
        producer: Producer,
    ) -> Self {
        Self {
            key,
            segment,
            locator,
            metadata,
            producer,
        }
    }

    pub fn key(&self) -> &ArtifactKey {
        &self.key
    }

    pub fn stage(&self) -> &str {
        &self.key.stage
    }

    pub fn tags(&self) -> &[Tag] {
        &self.key.tags
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.key.detectors
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    pub fn locator(&self) -> &Path {
        &self.locator
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }

    pub fn producer(&self) -> Producer {
        self.producer
    }

    /// Whether a per-detector job for `detector` should consume this.
    ///
    /// Single-detector artifacts only feed their own detector; artifacts
    /// spanning several detectors (or none) are shared.
    pub fn applies_to(&self, detector: &str) -> bool {
        match self.key.detectors.as_single() {
            Some(only) => only.eq_ignore_ascii_case(detector),
            None => true,
        }
    }
}

/// An output a stage factory declares for one of its jobs.
///
/// The builder turns it into an [`Artifact`]: the key's stage and tags come
/// from the job, `extra_tags` are appended, and the locator follows the
/// artifact naming convention inside the workflow's output directory.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub name: String,
    pub detectors: DetectorSet,
    pub segment: Segment,
    pub extension: String,
    pub extra_tags: Vec<Tag>,
    pub metadata: BTreeMap<String, String>,
}

impl OutputSpec {
    pub fn new(
        name: impl Into<String>,
        detectors: DetectorSet,
        segment: Segment,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            detectors,
            segment,
            extension: extension.into(),
            extra_tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.extra_tags.push(tag.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
