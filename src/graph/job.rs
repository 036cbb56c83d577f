// src/graph/job.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::artifact::{ArtifactId, OutputSpec};
use crate::types::{DetectorSet, Tag};

/// Handle to a sealed job inside its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JobId(pub(crate) usize);

impl JobId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job{:05}", self.0)
    }
}

/// Identity of a job: `(stage, tags, detectors)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JobKey {
    pub stage: String,
    pub tags: Vec<Tag>,
    pub detectors: DetectorSet,
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.stage, self.tags.join(","), self.detectors)
    }
}

/// A job a stage factory wants created, before the builder seals it.
///
/// Drafts are plain data: the factory fills them in and the builder turns
/// them into a [`Job`] with registered outputs in one step.
#[derive(Debug, Clone)]
pub struct JobDraft {
    pub detectors: DetectorSet,
    /// Appended to the caller's tags, e.g. a bank-split index.
    pub extra_tags: Vec<Tag>,
    pub inputs: Vec<ArtifactId>,
    pub outputs: Vec<OutputSpec>,
    pub options: BTreeMap<String, String>,
}

impl JobDraft {
    pub fn new(detectors: DetectorSet) -> Self {
        Self {
            detectors,
            extra_tags: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn tag(mut self, tag: impl Into<Tag>) -> Self {
        self.extra_tags.push(tag.into());
        self
    }

    pub fn input(mut self, id: ArtifactId) -> Self {
        if !self.inputs.contains(&id) {
            self.inputs.push(id);
        }
        self
    }

    pub fn inputs(mut self, ids: impl IntoIterator<Item = ArtifactId>) -> Self {
        for id in ids {
            self = self.input(id);
        }
        self
    }

    pub fn output(mut self, spec: OutputSpec) -> Self {
        self.outputs.push(spec);
        self
    }

    pub fn options(mut self, options: BTreeMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }
}

/// A sealed job. Inputs, outputs and options are fixed at sealing time,
/// so the dependency edges derived from them never change afterwards.
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    key: JobKey,
    inputs: Vec<ArtifactId>,
    outputs: Vec<ArtifactId>,
    options: BTreeMap<String, String>,
}

impl Job {
    pub(crate) fn sealed(
        id: JobId,
        key: JobKey,
        inputs: Vec<ArtifactId>,
        outputs: Vec<ArtifactId>,
        options: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id,
            key,
            inputs,
            outputs,
            options,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn stage(&self) -> &str {
        &self.key.stage
    }

    pub fn inputs(&self) -> &[ArtifactId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ArtifactId] {
        &self.outputs
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }
}
