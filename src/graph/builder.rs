// src/graph/builder.rs

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::artifact::{Artifact, ArtifactId, ArtifactKey};
use crate::config::ConfigFile;
use crate::errors::Result;
use crate::graph::job::{JobDraft, JobKey};
use crate::graph::workflow::{ExternalArtifact, Workflow};
use crate::segments::{Segment, SegmentListDict};
use crate::types::{DetectorSet, Tag};

/// An upstream artifact as seen by a stage factory.
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    pub id: ArtifactId,
    pub artifact: &'a Artifact,
}

/// Everything a stage factory may look at when planning its jobs.
#[derive(Debug)]
pub struct StageRequest<'a> {
    pub stage: &'a str,
    pub inputs: Vec<StageInput<'a>>,
    pub analyzable: &'a SegmentListDict,
    pub tags: &'a [Tag],
    /// Detectors this invocation is scoped to.
    pub detectors: &'a DetectorSet,
    pub span: Segment,
    pub config: &'a ConfigFile,
}

impl<'a> StageRequest<'a> {
    /// Inputs relevant to a per-detector job: that detector's own artifacts
    /// plus every shared one.
    pub fn inputs_for<'r>(&'r self, detector: &'r str) -> impl Iterator<Item = &'r StageInput<'a>> + 'r {
        self.inputs
            .iter()
            .filter(move |input| input.artifact.applies_to(detector))
    }

    pub fn inputs_from<'r>(&'r self, stage: &'r str) -> impl Iterator<Item = &'r StageInput<'a>> + 'r {
        self.inputs
            .iter()
            .filter(move |input| input.artifact.stage() == stage)
    }

    pub fn input_ids(&self) -> Vec<ArtifactId> {
        self.inputs.iter().map(|i| i.id).collect()
    }

    /// Merged options of `[stage]`, `[stage-{tag}]` and `[stage-{detector}]`.
    pub fn options_for(&self, detector: Option<&str>) -> BTreeMap<String, String> {
        let mut scopes: Vec<String> = self.tags.to_vec();
        if let Some(det) = detector {
            scopes.push(det.to_string());
        }
        self.config.options_for(self.stage, &scopes)
    }

    /// Extent of the detector's analyzable time, or `None` if it has none.
    pub fn analyzable_extent(&self, detector: &str) -> Option<Segment> {
        self.analyzable.get(detector).and_then(|l| l.extent())
    }
}

/// A pipeline stage: knows how to turn upstream artifacts into job drafts.
///
/// Implementations only plan. They never register anything themselves;
/// the builder assigns identities and seals the jobs.
pub trait StageFactory {
    fn stage(&self) -> &str;

    fn plan(&self, request: &StageRequest<'_>) -> Result<Vec<JobDraft>>;

    /// Planning parameters that change the drafts for identical inputs.
    ///
    /// Part of the memoization key; factories whose plan depends only on
    /// the request keep the empty default.
    fn fingerprint(&self) -> String {
        String::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Invocation {
    stage: String,
    fingerprint: String,
    tags: Vec<Tag>,
    detectors: DetectorSet,
    inputs: Vec<ArtifactKey>,
}

/// Runs stage factories against one [`Workflow`].
///
/// The builder memoizes invocations: asking for the same stage with the
/// same parameters, tags, scope and upstream identities returns the artifacts from
/// the first call instead of planning new jobs, so shared ancestors are
/// referenced rather than recomputed across tag branches.
pub struct JobGraphBuilder<'c> {
    workflow: Workflow,
    config: &'c ConfigFile,
    analyzable: SegmentListDict,
    memo: HashMap<Invocation, Vec<ArtifactId>>,
}

impl<'c> JobGraphBuilder<'c> {
    pub fn new(workflow: Workflow, config: &'c ConfigFile, analyzable: SegmentListDict) -> Self {
        Self {
            workflow,
            config,
            analyzable,
            memo: HashMap::new(),
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn config(&self) -> &'c ConfigFile {
        self.config
    }

    pub fn analyzable(&self) -> &SegmentListDict {
        &self.analyzable
    }

    pub fn artifact(&self, id: ArtifactId) -> Result<&Artifact> {
        self.workflow.artifact(id)
    }

    pub fn register_external(&mut self, external: ExternalArtifact) -> Result<ArtifactId> {
        self.workflow.register_external(external)
    }

    /// Run a stage over the workflow's full detector set.
    pub fn run_stage(
        &mut self,
        factory: &dyn StageFactory,
        inputs: &[ArtifactId],
        tags: &[Tag],
    ) -> Result<Vec<ArtifactId>> {
        let detectors = self.workflow.detectors().clone();
        self.run_stage_scoped(factory, inputs, tags, &detectors)
    }

    /// Run a stage restricted to `detectors`.
    pub fn run_stage_scoped(
        &mut self,
        factory: &dyn StageFactory,
        inputs: &[ArtifactId],
        tags: &[Tag],
        detectors: &DetectorSet,
    ) -> Result<Vec<ArtifactId>> {
        let stage = factory.stage().to_string();

        let mut input_keys = Vec::with_capacity(inputs.len());
        for id in inputs {
            input_keys.push(self.workflow.artifact(*id)?.key().clone());
        }
        let invocation = Invocation {
            stage: stage.clone(),
            fingerprint: factory.fingerprint(),
            tags: tags.to_vec(),
            detectors: detectors.clone(),
            inputs: input_keys,
        };

        if let Some(outputs) = self.memo.get(&invocation) {
            debug!(stage = %stage, tags = ?tags, "reusing outputs of earlier invocation");
            return Ok(outputs.clone());
        }

        let drafts = {
            let mut stage_inputs = Vec::with_capacity(inputs.len());
            for id in inputs {
                stage_inputs.push(StageInput {
                    id: *id,
                    artifact: self.workflow.artifact(*id)?,
                });
            }
            let request = StageRequest {
                stage: &stage,
                inputs: stage_inputs,
                analyzable: &self.analyzable,
                tags,
                detectors,
                span: self.workflow.span(),
                config: self.config,
            };
            factory.plan(&request)?
        };

        let job_count = drafts.len();
        let mut outputs = Vec::new();
        for draft in drafts {
            let mut job_tags = tags.to_vec();
            job_tags.extend(draft.extra_tags.iter().cloned());
            let key = JobKey {
                stage: stage.clone(),
                tags: job_tags,
                detectors: draft.detectors.clone(),
            };
            let id = self.workflow.seal_job(key, draft)?;
            if let Some(job) = self.workflow.job(id) {
                outputs.extend_from_slice(job.outputs());
            }
        }

        info!(
            workflow = %self.workflow.name(),
            stage = %stage,
            tags = ?tags,
            jobs = job_count,
            outputs = outputs.len(),
            "planned stage"
        );
        self.memo.insert(invocation, outputs.clone());
        Ok(outputs)
    }

    /// Hand back the workflow after checking it is acyclic.
    pub fn finish(self) -> Result<Workflow> {
        self.workflow.topological_order()?;
        Ok(self.workflow)
    }
}
