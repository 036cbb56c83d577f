// src/expand/conditional.rs

use tracing::debug;

use crate::artifact::ArtifactId;
use crate::config::ConfigFile;
use crate::errors::{CoincflowError, Result};
use crate::expand::axes::{Axis, cartesian};
use crate::graph::{JobGraphBuilder, StageFactory};
use crate::types::{DetectorSet, Tag};

/// An optional stage switched on by the presence of a per-tag option.
#[derive(Clone, Copy)]
pub struct ConditionalStage<'f> {
    pub option: &'static str,
    pub factory: &'f dyn StageFactory,
}

/// What happened at one link of a conditional chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResolution {
    /// The option was set; the stage ran and produced `artifact`.
    Applied {
        option: &'static str,
        stage: String,
        artifact: ArtifactId,
    },
    /// The option was absent; `artifact` is forwarded untouched, so the
    /// next consumer's producer is still the earlier job.
    Forwarded {
        option: &'static str,
        artifact: ArtifactId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    /// Artifact the next stage should consume.
    pub artifact: ArtifactId,
    pub steps: Vec<StepResolution>,
}

/// Per-tag stage inclusion and detector × tag fan-out.
///
/// Options are looked up tag-scoped in `section`: `[{section}-{tag}]` first,
/// then `[{section}]`.
#[derive(Debug, Clone)]
pub struct TagExpander {
    section: String,
}

impl TagExpander {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
        }
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn is_enabled(&self, config: &ConfigFile, option: &str, tag: &str) -> bool {
        config.has_option_tags(&self.section, option, &[tag.to_string()])
    }

    /// Thread `input` through `chain`, running each stage whose option is
    /// set for `tag` and forwarding the current artifact past the others.
    pub fn apply_chain(
        &self,
        builder: &mut JobGraphBuilder<'_>,
        input: ArtifactId,
        tag: &str,
        chain: &[ConditionalStage<'_>],
    ) -> Result<ChainOutcome> {
        let tags: Vec<Tag> = vec![tag.to_string()];
        let mut current = input;
        let mut steps = Vec::with_capacity(chain.len());

        for link in chain {
            if self.is_enabled(builder.config(), link.option, tag) {
                let outputs = builder.run_stage(link.factory, &[current], &tags)?;
                let [produced] = outputs.as_slice() else {
                    return Err(CoincflowError::GraphError(format!(
                        "optional stage '{}' must produce exactly one artifact for tag '{tag}', got {}",
                        link.factory.stage(),
                        outputs.len()
                    )));
                };
                current = *produced;
                steps.push(StepResolution::Applied {
                    option: link.option,
                    stage: link.factory.stage().to_string(),
                    artifact: current,
                });
            } else {
                debug!(tag, option = link.option, "option absent; forwarding previous artifact");
                steps.push(StepResolution::Forwarded {
                    option: link.option,
                    artifact: current,
                });
            }
        }

        Ok(ChainOutcome {
            artifact: current,
            steps,
        })
    }

    /// Run `factory` once per (detector, tag) cell, each scoped to one
    /// detector and tagged with one tag.
    ///
    /// `inputs_for(detector, tag)` supplies the cell's upstream artifacts.
    /// Returns the outputs of every cell in product order.
    pub fn expand_cells<F>(
        &self,
        builder: &mut JobGraphBuilder<'_>,
        factory: &dyn StageFactory,
        detectors: &Axis,
        tags: &Axis,
        mut inputs_for: F,
    ) -> Result<Vec<ArtifactId>>
    where
        F: FnMut(&str, &str) -> Result<Vec<ArtifactId>>,
    {
        let axes = [detectors.clone(), tags.clone()];
        let mut outputs = Vec::new();

        for cell in cartesian(&axes) {
            let (Some(detector), Some(tag)) = (cell.get(detectors.name()), cell.get(tags.name()))
            else {
                continue;
            };
            let inputs = inputs_for(detector, tag)?;
            let scope = DetectorSet::single(detector);
            outputs.extend(builder.run_stage_scoped(factory, &inputs, &[tag.to_string()], &scope)?);
        }

        Ok(outputs)
    }
}
