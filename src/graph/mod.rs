// src/graph/mod.rs

//! Job graph construction.
//!
//! - [`job`] holds unsealed job drafts and sealed, immutable jobs.
//! - [`workflow`] is one DAG of sealed jobs plus its artifact registry.
//! - [`builder`] runs stage factories and seals what they plan.
//! - [`container`] groups workflows with explicit cross-workflow edges.

pub mod builder;
pub mod container;
pub mod job;
pub mod workflow;

pub use builder::{JobGraphBuilder, StageFactory, StageInput, StageRequest};
pub use container::{Container, ContainerNode, SubworkflowComposer, WorkflowId};
pub use job::{Job, JobDraft, JobId, JobKey};
pub use workflow::{ExternalArtifact, Workflow};
