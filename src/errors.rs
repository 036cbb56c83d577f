// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoincflowError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration error: veto category '{category}' has no segment data for {detector}")]
    MissingVetoCategory { detector: String, category: String },

    #[error("Segment algebra violation: {0}")]
    SegmentAlgebra(String),

    #[error("Identity collision: {0}")]
    IdentityCollision(String),

    #[error("Graph error: {0}")]
    GraphError(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CoincflowError {
    /// Errors caused by user-supplied configuration or segment inputs.
    ///
    /// These are raised during preflight, before any job exists.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CoincflowError::ConfigError(_) | CoincflowError::MissingVetoCategory { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CoincflowError>;
