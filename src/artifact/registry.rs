// src/artifact/registry.rs

use std::collections::HashMap;
use std::path::PathBuf;

use blake3::Hasher;
use tracing::debug;

use crate::artifact::artifact::{Artifact, ArtifactId, ArtifactKey, Producer};
use crate::errors::{CoincflowError, Result};

/// Registered artifacts of one workflow plus the producer map.
///
/// Dependency inference never compares artifacts by reference: a consumer
/// holds an [`ArtifactId`], and the producing job is looked up through the
/// key → producer map populated here.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    artifacts: Vec<Artifact>,
    fingerprints: Vec<String>,
    by_key: HashMap<ArtifactKey, ArtifactId>,
    by_locator: HashMap<PathBuf, ArtifactId>,
    producers: HashMap<ArtifactKey, Producer>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact and return its handle.
    ///
    /// Re-registering an identical artifact returns the existing handle. A
    /// different artifact under an existing key, or a second artifact at an
    /// existing locator, is an [`CoincflowError::IdentityCollision`].
    pub fn register(&mut self, artifact: Artifact) -> Result<ArtifactId> {
        let fingerprint = fingerprint(&artifact);

        if let Some(&existing) = self.by_key.get(artifact.key()) {
            if self.fingerprints[existing.0] == fingerprint {
                debug!(key = %artifact.key(), "artifact already registered");
                return Ok(existing);
            }
            return Err(CoincflowError::IdentityCollision(format!(
                "artifact {} registered twice with different content",
                artifact.key()
            )));
        }

        if let Some(&other) = self.by_locator.get(artifact.locator()) {
            return Err(CoincflowError::IdentityCollision(format!(
                "artifacts {} and {} share locator {:?}",
                self.artifacts[other.0].key(),
                artifact.key(),
                artifact.locator()
            )));
        }

        let id = ArtifactId(self.artifacts.len());
        self.by_key.insert(artifact.key().clone(), id);
        self.by_locator.insert(artifact.locator().to_path_buf(), id);
        self.producers.insert(artifact.key().clone(), artifact.producer());
        self.fingerprints.push(fingerprint);
        self.artifacts.push(artifact);
        Ok(id)
    }

    pub fn get(&self, id: ArtifactId) -> Option<&Artifact> {
        self.artifacts.get(id.0)
    }

    /// Like [`get`](Self::get), but an unknown handle is a graph error.
    pub fn resolve(&self, id: ArtifactId) -> Result<&Artifact> {
        self.get(id).ok_or_else(|| {
            CoincflowError::GraphError(format!("artifact #{} is not registered", id.0))
        })
    }

    pub fn lookup(&self, key: &ArtifactKey) -> Option<ArtifactId> {
        self.by_key.get(key).copied()
    }

    pub fn producer_of(&self, key: &ArtifactKey) -> Option<Producer> {
        self.producers.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactId, &Artifact)> {
        self.artifacts
            .iter()
            .enumerate()
            .map(|(i, a)| (ArtifactId(i), a))
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Content hash over everything that defines an artifact besides its key.
fn fingerprint(artifact: &Artifact) -> String {
    let mut hasher = Hasher::new();
    hasher.update(artifact.key().to_string().as_bytes());
    hasher.update(&artifact.segment().start().to_le_bytes());
    hasher.update(&artifact.segment().end().to_le_bytes());
    hasher.update(artifact.locator().to_string_lossy().as_bytes());
    for (k, v) in artifact.metadata() {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"\n");
    }
    match artifact.producer() {
        Producer::Job(job) => {
            hasher.update(b"job:");
            hasher.update(&job.index().to_le_bytes());
        }
        Producer::External => {
            hasher.update(b"external");
        }
    }
    hasher.finalize().to_hex().to_string()
}
