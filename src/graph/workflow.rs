// src/graph/workflow.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::artifact::{
    Artifact, ArtifactId, ArtifactKey, ArtifactName, ArtifactRegistry, Producer, description_for,
};
use crate::errors::{CoincflowError, Result};
use crate::graph::job::{Job, JobDraft, JobId, JobKey};
use crate::segments::Segment;
use crate::types::{DetectorSet, Tag};

/// A pre-existing file (or one written by the planner itself) that jobs
/// may consume. Registered with [`Producer::External`].
#[derive(Debug, Clone)]
pub struct ExternalArtifact {
    pub stage: String,
    pub name: String,
    pub tags: Vec<Tag>,
    pub detectors: DetectorSet,
    pub segment: Segment,
    pub locator: PathBuf,
    pub metadata: BTreeMap<String, String>,
}

/// One DAG of sealed jobs over an analysis span and detector set.
///
/// Jobs are append-only. Edges are not stored: a job's parents are the
/// producers of its inputs, looked up through the registry's producer map.
#[derive(Debug, Clone)]
pub struct Workflow {
    name: String,
    span: Segment,
    detectors: DetectorSet,
    output_dir: PathBuf,
    jobs: Vec<Job>,
    job_index: HashMap<JobKey, JobId>,
    registry: ArtifactRegistry,
}

impl Workflow {
    pub fn new(
        name: impl Into<String>,
        span: Segment,
        detectors: DetectorSet,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            span,
            detectors,
            output_dir: output_dir.into(),
            jobs: Vec::new(),
            job_index: HashMap::new(),
            registry: ArtifactRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn span(&self) -> Segment {
        self.span
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id.0)
    }

    pub fn job_by_key(&self, key: &JobKey) -> Option<&Job> {
        self.job_index.get(key).and_then(|id| self.job(*id))
    }

    pub fn jobs_in_stage<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a Job> + 'a {
        self.jobs.iter().filter(move |j| j.stage() == stage)
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.registry
    }

    pub fn artifact(&self, id: ArtifactId) -> Result<&Artifact> {
        self.registry.resolve(id)
    }

    pub fn register_external(&mut self, external: ExternalArtifact) -> Result<ArtifactId> {
        let key = ArtifactKey {
            stage: external.stage,
            tags: external.tags,
            detectors: external.detectors,
            name: external.name,
        };
        let artifact = Artifact::new(
            key,
            external.segment,
            external.locator,
            external.metadata,
            Producer::External,
        );
        self.registry.register(artifact)
    }

    /// Seal a drafted job: check its inputs, register its outputs and append it.
    pub(crate) fn seal_job(&mut self, key: JobKey, draft: JobDraft) -> Result<JobId> {
        if self.job_index.contains_key(&key) {
            return Err(CoincflowError::IdentityCollision(format!(
                "job {key} planned twice in workflow '{}'",
                self.name
            )));
        }
        for input in &draft.inputs {
            self.registry.resolve(*input)?;
        }

        let id = JobId(self.jobs.len());
        let mut outputs = Vec::with_capacity(draft.outputs.len());

        for spec in draft.outputs {
            let mut tags = key.tags.clone();
            tags.extend(spec.extra_tags);
            let description = description_for(&spec.name, &tags);
            let file_name = ArtifactName::new(&spec.detectors, description, &spec.segment, &spec.extension);
            let artifact_key = ArtifactKey {
                stage: key.stage.clone(),
                tags,
                detectors: spec.detectors,
                name: spec.name,
            };
            let artifact = Artifact::new(
                artifact_key,
                spec.segment,
                self.output_dir.join(file_name.to_string()),
                spec.metadata,
                Producer::Job(id),
            );
            outputs.push(self.registry.register(artifact)?);
        }

        debug!(workflow = %self.name, job = %id, key = %key, outputs = outputs.len(), "sealed job");
        self.job_index.insert(key.clone(), id);
        self.jobs
            .push(Job::sealed(id, key, draft.inputs, outputs, draft.options));
        Ok(id)
    }

    /// Producer job of an artifact, if it was made inside this workflow.
    pub fn producer_job(&self, id: ArtifactId) -> Option<JobId> {
        let artifact = self.registry.get(id)?;
        self.registry.producer_of(artifact.key())?.job()
    }

    /// Distinct producer jobs of `job`'s inputs.
    pub fn parents_of(&self, job: JobId) -> Vec<JobId> {
        let Some(job) = self.job(job) else {
            return Vec::new();
        };
        job.inputs()
            .iter()
            .filter_map(|input| self.producer_job(*input))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// All `parent -> child` edges.
    pub fn edges(&self) -> Vec<(JobId, JobId)> {
        self.jobs
            .iter()
            .flat_map(|job| {
                self.parents_of(job.id())
                    .into_iter()
                    .map(move |parent| (parent, job.id()))
            })
            .collect()
    }

    pub fn dependency_graph(&self) -> DiGraphMap<JobId, ()> {
        let mut graph = DiGraphMap::new();
        for job in &self.jobs {
            graph.add_node(job.id());
        }
        for (parent, child) in self.edges() {
            graph.add_edge(parent, child, ());
        }
        graph
    }

    pub fn topological_order(&self) -> Result<Vec<JobId>> {
        toposort(&self.dependency_graph(), None).map_err(|cycle| {
            CoincflowError::DagCycle(format!(
                "cycle in workflow '{}' involving {}",
                self.name,
                cycle.node_id()
            ))
        })
    }

    /// Jobs with no parent inside this workflow.
    pub fn roots(&self) -> Vec<JobId> {
        self.jobs
            .iter()
            .map(Job::id)
            .filter(|id| self.parents_of(*id).is_empty())
            .collect()
    }

    /// Jobs whose outputs nothing in this workflow consumes.
    pub fn leaves(&self) -> Vec<JobId> {
        let parents: BTreeSet<JobId> = self.edges().into_iter().map(|(p, _)| p).collect();
        self.jobs
            .iter()
            .map(Job::id)
            .filter(|id| !parents.contains(id))
            .collect()
    }
}
