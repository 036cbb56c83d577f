// src/graph/container.rs

use std::fmt;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::Serialize;
use tracing::info;

use crate::errors::{CoincflowError, Result};
use crate::graph::job::JobId;
use crate::graph::workflow::Workflow;
use crate::types::DetectorSet;

/// Handle to a workflow inside a [`Container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WorkflowId(pub(crate) usize);

impl WorkflowId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Node of the container-wide graph: a job qualified by its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerNode {
    pub workflow: WorkflowId,
    pub job: JobId,
}

impl fmt::Display for ContainerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wf{}:{}", self.workflow.0, self.job)
    }
}

/// Sub-workflows plus explicit workflow-level dependencies.
///
/// The container's own name and detector set are independent of the
/// workflows it holds.
#[derive(Debug, Clone)]
pub struct Container {
    name: String,
    detectors: DetectorSet,
    workflows: Vec<Workflow>,
    dependencies: Vec<(WorkflowId, WorkflowId)>,
}

impl Container {
    pub fn new(name: impl Into<String>, detectors: DetectorSet) -> Self {
        Self {
            name: name.into(),
            detectors,
            workflows: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    pub fn workflow(&self, id: WorkflowId) -> Option<&Workflow> {
        self.workflows.get(id.0)
    }

    pub fn workflow_id(&self, name: &str) -> Option<WorkflowId> {
        self.workflows
            .iter()
            .position(|w| w.name() == name)
            .map(WorkflowId)
    }

    /// `(parent, child)`: child runs after parent has finished.
    pub fn dependencies(&self) -> &[(WorkflowId, WorkflowId)] {
        &self.dependencies
    }

    pub fn add_workflow(&mut self, workflow: Workflow) -> Result<WorkflowId> {
        if self.workflow_id(workflow.name()).is_some() {
            return Err(CoincflowError::GraphError(format!(
                "container '{}' already holds a workflow named '{}'",
                self.name,
                workflow.name()
            )));
        }
        self.workflows.push(workflow);
        Ok(WorkflowId(self.workflows.len() - 1))
    }

    /// Make `child` depend on `parent`.
    ///
    /// A container carries exactly one such edge.
    pub fn add_explicit_dependency(&mut self, parent: WorkflowId, child: WorkflowId) -> Result<()> {
        if self.workflow(parent).is_none() || self.workflow(child).is_none() {
            return Err(CoincflowError::GraphError(
                "explicit dependency names a workflow not in this container".to_string(),
            ));
        }
        if parent == child {
            return Err(CoincflowError::GraphError(
                "a workflow cannot depend on itself".to_string(),
            ));
        }
        if !self.dependencies.is_empty() {
            return Err(CoincflowError::GraphError(format!(
                "container '{}' already has its cross-workflow dependency",
                self.name
            )));
        }
        self.dependencies.push((parent, child));
        Ok(())
    }

    pub fn parents_of(&self, child: WorkflowId) -> Vec<WorkflowId> {
        self.dependencies
            .iter()
            .filter(|(_, c)| *c == child)
            .map(|(p, _)| *p)
            .collect()
    }

    pub fn children_of(&self, parent: WorkflowId) -> Vec<WorkflowId> {
        self.dependencies
            .iter()
            .filter(|(p, _)| *p == parent)
            .map(|(_, c)| *c)
            .collect()
    }

    /// Job-level graph of the whole container.
    ///
    /// A workflow dependency expands to edges from every leaf job of the
    /// parent to every root job of the child.
    pub fn dependency_graph(&self) -> DiGraphMap<ContainerNode, ()> {
        let mut graph = DiGraphMap::new();

        for (i, wf) in self.workflows.iter().enumerate() {
            let workflow = WorkflowId(i);
            for job in wf.jobs() {
                graph.add_node(ContainerNode { workflow, job: job.id() });
            }
            for (parent, child) in wf.edges() {
                graph.add_edge(
                    ContainerNode { workflow, job: parent },
                    ContainerNode { workflow, job: child },
                    (),
                );
            }
        }

        for (parent, child) in &self.dependencies {
            let (Some(pw), Some(cw)) = (self.workflow(*parent), self.workflow(*child)) else {
                continue;
            };
            for leaf in pw.leaves() {
                for root in cw.roots() {
                    graph.add_edge(
                        ContainerNode { workflow: *parent, job: leaf },
                        ContainerNode { workflow: *child, job: root },
                        (),
                    );
                }
            }
        }

        graph
    }

    /// Edges of the expanded graph leaving `from` and landing in `to`.
    pub fn edges_between(&self, from: WorkflowId, to: WorkflowId) -> usize {
        let graph = self.dependency_graph();
        graph
            .nodes()
            .filter(|n| n.workflow == from)
            .map(|n| {
                graph
                    .neighbors_directed(n, Direction::Outgoing)
                    .filter(|m| m.workflow == to)
                    .count()
            })
            .sum()
    }

    /// Check the container is ready for emission: exactly one cross edge
    /// and an acyclic job graph.
    pub fn validate(&self) -> Result<()> {
        if self.dependencies.len() != 1 {
            return Err(CoincflowError::GraphError(format!(
                "container '{}' has {} cross-workflow dependencies, expected exactly 1",
                self.name,
                self.dependencies.len()
            )));
        }
        toposort(&self.dependency_graph(), None).map_err(|cycle| {
            CoincflowError::DagCycle(format!(
                "cycle in container '{}' involving {}",
                self.name,
                cycle.node_id()
            ))
        })?;
        Ok(())
    }
}

/// Seals the analysis and finalization workflows into one container.
pub struct SubworkflowComposer;

impl SubworkflowComposer {
    /// The finalization workflow consumes the rendered results directory as
    /// a whole, so no per-artifact edge could express its dependency; it
    /// gets one explicit edge on the analysis workflow instead.
    pub fn compose(
        name: impl Into<String>,
        detectors: DetectorSet,
        analysis: Workflow,
        finalization: Workflow,
    ) -> Result<Container> {
        let mut container = Container::new(name, detectors);
        let analysis_id = container.add_workflow(analysis)?;
        let finalization_id = container.add_workflow(finalization)?;
        container.add_explicit_dependency(analysis_id, finalization_id)?;
        container.validate()?;

        info!(
            container = %container.name(),
            workflows = container.workflows().len(),
            "composed container"
        );
        Ok(container)
    }
}
