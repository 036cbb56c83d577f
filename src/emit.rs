// src/emit.rs

//! Serialized form of a planned container and the files written beside it.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::artifact::{LinkReport, ResultSection};
use crate::config::ConfigFile;
use crate::errors::{CoincflowError, Result};
use crate::fs::FileSystem;
use crate::graph::{Container, Workflow};
use crate::pipeline::BuildContext;
use crate::segments::Segment;
use crate::types::{DetectorSet, Tag};

#[derive(Debug, Clone, Serialize)]
pub struct ContainerDocument {
    pub name: String,
    pub detectors: DetectorSet,
    pub workflows: Vec<WorkflowDocument>,
    pub dependencies: Vec<DependencyDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowDocument {
    pub name: String,
    pub span: Segment,
    pub detectors: DetectorSet,
    pub jobs: Vec<JobDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobDocument {
    pub id: String,
    pub stage: String,
    pub tags: Vec<Tag>,
    pub detectors: DetectorSet,
    pub options: BTreeMap<String, String>,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub parents: Vec<String>,
}

/// Workflow-level edge, by workflow name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDocument {
    pub parent: String,
    pub child: String,
}

/// What [`write_outputs`] put on disk.
#[derive(Debug, Clone)]
pub struct EmitReport {
    pub workflow_document: PathBuf,
    pub links: LinkReport,
}

pub fn container_document(container: &Container) -> Result<ContainerDocument> {
    let mut workflows = Vec::with_capacity(container.workflows().len());
    for workflow in container.workflows() {
        workflows.push(workflow_document(workflow)?);
    }

    let mut dependencies = Vec::new();
    for (parent, child) in container.dependencies() {
        let (Some(parent), Some(child)) = (container.workflow(*parent), container.workflow(*child))
        else {
            return Err(CoincflowError::GraphError(format!(
                "container '{}' has a dependency on an unknown workflow",
                container.name()
            )));
        };
        dependencies.push(DependencyDocument {
            parent: parent.name().to_string(),
            child: child.name().to_string(),
        });
    }

    Ok(ContainerDocument {
        name: container.name().to_string(),
        detectors: container.detectors().clone(),
        workflows,
        dependencies,
    })
}

fn workflow_document(workflow: &Workflow) -> Result<WorkflowDocument> {
    let mut jobs = Vec::with_capacity(workflow.jobs().len());

    // Topological order so a reader can replay the document top to bottom.
    for id in workflow.topological_order()? {
        let Some(job) = workflow.job(id) else {
            continue;
        };
        let mut inputs = Vec::with_capacity(job.inputs().len());
        for input in job.inputs() {
            inputs.push(workflow.artifact(*input)?.locator().to_path_buf());
        }
        let mut outputs = Vec::with_capacity(job.outputs().len());
        for output in job.outputs() {
            outputs.push(workflow.artifact(*output)?.locator().to_path_buf());
        }

        jobs.push(JobDocument {
            id: job.id().to_string(),
            stage: job.stage().to_string(),
            tags: job.key().tags.clone(),
            detectors: job.key().detectors.clone(),
            options: job.options().clone(),
            inputs,
            outputs,
            parents: workflow
                .parents_of(id)
                .into_iter()
                .map(|p| p.to_string())
                .collect(),
        });
    }

    Ok(WorkflowDocument {
        name: workflow.name().to_string(),
        span: workflow.span(),
        detectors: workflow.detectors().clone(),
        jobs,
    })
}

/// Write the segment document, the resolved configuration and the workflow
/// document, then build the results tree and link every classified file.
///
/// Link failures are reported, never raised.
pub fn write_outputs(
    fs: &dyn FileSystem,
    container: &Container,
    ctx: &mut BuildContext,
    config: &ConfigFile,
) -> Result<EmitReport> {
    fs.create_dir_all(ctx.output_dir())?;

    if let Some((path, document)) = &ctx.segment_output {
        document.save(fs, path)?;
        debug!(path = ?path, "wrote segment document");
    }
    if let Some(path) = &ctx.config_output {
        fs.write(path, config.to_toml_string()?.as_bytes())?;
        debug!(path = ?path, "wrote resolved configuration");
    }

    let document = container_document(container)?;
    let document_path = ctx.workflow_document_path();
    let json = serde_json::to_string_pretty(&document)?;
    fs.write(&document_path, json.as_bytes())?;
    ctx.report.classify_path(
        format!("{} workflow", container.name()),
        document_path.clone(),
        ResultSection::Workflow,
    );

    ctx.layout.materialize(fs)?;
    let links = ctx.report.link_all(fs, &ctx.layout);

    info!(
        path = ?document_path,
        linked = links.linked,
        already_present = links.already_present,
        failed = links.failed,
        "wrote workflow"
    );
    Ok(EmitReport {
        workflow_document: document_path,
        links,
    })
}

/// Human-readable outline of a container, used for dry runs.
pub fn summary(container: &Container) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "coincflow dry-run: {}", container.name());
    let _ = writeln!(out, "  detectors: {}", container.detectors());
    let _ = writeln!(out);

    for workflow in container.workflows() {
        let _ = writeln!(
            out,
            "workflow {} ({} jobs, {} artifacts, span {})",
            workflow.name(),
            workflow.jobs().len(),
            workflow.artifacts().len(),
            workflow.span()
        );
        let mut per_stage: BTreeMap<&str, usize> = BTreeMap::new();
        for job in workflow.jobs() {
            *per_stage.entry(job.stage()).or_default() += 1;
        }
        for (stage, count) in per_stage {
            let _ = writeln!(out, "  - {stage}: {count}");
        }
    }

    for (parent, child) in container.dependencies() {
        if let (Some(p), Some(c)) = (container.workflow(*parent), container.workflow(*child)) {
            let _ = writeln!(out, "depends: {} -> {}", p.name(), c.name());
        }
    }
    out
}
