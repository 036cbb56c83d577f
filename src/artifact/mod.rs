// src/artifact/mod.rs

//! Data artifacts: identity, naming, registration and results presentation.
//!
//! - [`artifact`] defines identity keys, producer links and output specs.
//! - [`naming`] implements the `{ifos}-{description}-{start}-{duration}.{ext}`
//!   file-name convention.
//! - [`registry`] owns registered artifacts and the producer map.
//! - [`sections`] classifies report-worthy artifacts into results sections.

#[allow(clippy::module_inception)]
pub mod artifact;
pub mod naming;
pub mod registry;
pub mod sections;

pub use artifact::{Artifact, ArtifactId, ArtifactKey, OutputSpec, Producer};
pub use naming::{ArtifactName, description_for};
pub use registry::ArtifactRegistry;
pub use sections::{LinkReport, ReportEntry, ReportIndex, ResultSection, ResultsLayout};
