// src/stages/factories.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::artifact::OutputSpec;
use crate::errors::{CoincflowError, Result};
use crate::graph::{JobDraft, StageFactory, StageRequest};
use crate::segments::{SegmentList, dedupe};
use crate::types::DetectorSet;

/// One job per detector in scope that has analyzable time.
///
/// Each job consumes that detector's inputs plus any shared ones and
/// produces one artifact valid over the detector's analyzable extent.
#[derive(Debug, Clone)]
pub struct PerDetectorStage {
    stage: &'static str,
    output: &'static str,
    extension: &'static str,
}

impl PerDetectorStage {
    pub fn new(stage: &'static str, output: &'static str, extension: &'static str) -> Self {
        Self {
            stage,
            output,
            extension,
        }
    }
}

impl StageFactory for PerDetectorStage {
    fn stage(&self) -> &str {
        self.stage
    }

    fn plan(&self, request: &StageRequest<'_>) -> Result<Vec<JobDraft>> {
        let mut drafts = Vec::new();
        for det in request.detectors.iter() {
            let Some(extent) = request.analyzable_extent(det) else {
                debug!(stage = self.stage, detector = det, "no analyzable time; no job");
                continue;
            };
            let ifo = DetectorSet::single(det);
            drafts.push(
                JobDraft::new(ifo.clone())
                    .inputs(request.inputs_for(det).map(|i| i.id))
                    .options(request.options_for(Some(det)))
                    .output(OutputSpec::new(self.output, ifo, extent, self.extension)),
            );
        }
        Ok(drafts)
    }
}

/// A single job over all detectors in scope, consuming every input and
/// producing one artifact valid over the workflow span.
#[derive(Debug, Clone)]
pub struct CombinedStage {
    stage: &'static str,
    output: &'static str,
    extension: &'static str,
    extra_options: BTreeMap<String, String>,
}

impl CombinedStage {
    pub fn new(stage: &'static str, output: &'static str, extension: &'static str) -> Self {
        Self {
            stage,
            output,
            extension,
            extra_options: BTreeMap::new(),
        }
    }

    /// Attach an option computed at planning time rather than read from config.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_options.insert(key.into(), value.into());
        self
    }
}

impl StageFactory for CombinedStage {
    fn stage(&self) -> &str {
        self.stage
    }

    fn fingerprint(&self) -> String {
        self.extra_options
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    fn plan(&self, request: &StageRequest<'_>) -> Result<Vec<JobDraft>> {
        let detectors = request.detectors.clone();
        let mut options = request.options_for(None);
        options.extend(self.extra_options.clone());
        Ok(vec![
            JobDraft::new(detectors.clone())
                .inputs(request.input_ids())
                .options(options)
                .output(OutputSpec::new(
                    self.output,
                    detectors,
                    request.span,
                    self.extension,
                )),
        ])
    }
}

/// Fan-out: one job splitting its single input bank into `num_banks`
/// sub-banks, each tagged `bank{i}` on top of the caller's tags.
#[derive(Debug, Clone)]
pub struct SplitBankStage {
    stage: &'static str,
    num_banks: usize,
}

impl SplitBankStage {
    pub const SPLIT_TAG: &'static str = "split-tag";
    pub const SPLIT_INDEX: &'static str = "split-index";

    pub fn new(stage: &'static str, num_banks: usize) -> Self {
        Self { stage, num_banks }
    }
}

impl StageFactory for SplitBankStage {
    fn stage(&self) -> &str {
        self.stage
    }

    fn fingerprint(&self) -> String {
        format!("num-banks={}", self.num_banks)
    }

    fn plan(&self, request: &StageRequest<'_>) -> Result<Vec<JobDraft>> {
        let [bank] = request.inputs.as_slice() else {
            return Err(CoincflowError::GraphError(format!(
                "{} splits exactly one bank, got {} inputs",
                self.stage,
                request.inputs.len()
            )));
        };
        if self.num_banks == 0 {
            return Err(CoincflowError::ConfigError(format!(
                "{} needs at least one sub-bank",
                self.stage
            )));
        }

        let source = bank.artifact;
        let mut options = request.options_for(None);
        options.insert("number-of-banks".to_string(), self.num_banks.to_string());

        let mut draft = JobDraft::new(source.detectors().clone())
            .input(bank.id)
            .options(options);
        for i in 0..self.num_banks {
            let tag = format!("bank{i}");
            draft = draft.output(
                OutputSpec::new("SPLITBANK", source.detectors().clone(), source.segment(), "hdf")
                    .tag(tag.clone())
                    .meta(Self::SPLIT_TAG, tag)
                    .meta(Self::SPLIT_INDEX, i.to_string())
                    .meta("num-splits", self.num_banks.to_string()),
            );
        }
        Ok(vec![draft])
    }
}

/// Matched filtering: one job per (detector, sub-bank).
///
/// Sub-banks are the inputs produced by `bank_stage`; every other input that
/// applies to the detector (data, PSD, gating, injections) feeds each of
/// that detector's jobs.
#[derive(Debug, Clone)]
pub struct MatchedFilterStage {
    stage: &'static str,
    bank_stage: &'static str,
    output: &'static str,
    extension: &'static str,
}

impl MatchedFilterStage {
    pub fn new(
        stage: &'static str,
        bank_stage: &'static str,
        output: &'static str,
        extension: &'static str,
    ) -> Self {
        Self {
            stage,
            bank_stage,
            output,
            extension,
        }
    }
}

impl StageFactory for MatchedFilterStage {
    fn stage(&self) -> &str {
        self.stage
    }

    fn plan(&self, request: &StageRequest<'_>) -> Result<Vec<JobDraft>> {
        let banks: Vec<_> = request.inputs_from(self.bank_stage).collect();
        if banks.is_empty() {
            return Err(CoincflowError::GraphError(format!(
                "{} needs at least one {} input",
                self.stage, self.bank_stage
            )));
        }

        let mut drafts = Vec::new();
        for det in request.detectors.iter() {
            let Some(extent) = request.analyzable_extent(det) else {
                debug!(stage = self.stage, detector = det, "no analyzable time; no job");
                continue;
            };
            let ifo = DetectorSet::single(det);
            let shared: Vec<_> = request
                .inputs_for(det)
                .filter(|i| i.artifact.stage() != self.bank_stage)
                .map(|i| i.id)
                .collect();

            for bank in &banks {
                let split = bank
                    .artifact
                    .meta(SplitBankStage::SPLIT_TAG)
                    .ok_or_else(|| {
                        CoincflowError::GraphError(format!(
                            "bank {} carries no split tag",
                            bank.artifact.key()
                        ))
                    })?;
                drafts.push(
                    JobDraft::new(ifo.clone())
                        .tag(split)
                        .input(bank.id)
                        .inputs(shared.iter().copied())
                        .options(request.options_for(Some(det)))
                        .output(OutputSpec::new(self.output, ifo.clone(), extent, self.extension)),
                );
            }
        }
        Ok(drafts)
    }
}

/// Fan-in: merge every single-detector sibling of a detector into one
/// artifact for that detector.
///
/// Siblings from a bank split all report the same validity interval; the
/// merged artifact covers their deduplicated, coalesced union.
#[derive(Debug, Clone)]
pub struct MergeByDetectorStage {
    stage: &'static str,
    output: &'static str,
    extension: &'static str,
}

impl MergeByDetectorStage {
    pub fn new(stage: &'static str, output: &'static str, extension: &'static str) -> Self {
        Self {
            stage,
            output,
            extension,
        }
    }
}

impl StageFactory for MergeByDetectorStage {
    fn stage(&self) -> &str {
        self.stage
    }

    fn plan(&self, request: &StageRequest<'_>) -> Result<Vec<JobDraft>> {
        let mut drafts = Vec::new();
        for det in request.detectors.iter() {
            let siblings: Vec<_> = request
                .inputs
                .iter()
                .filter(|i| i.artifact.detectors().as_single() == Some(det))
                .collect();
            if siblings.is_empty() {
                continue;
            }

            let reported: Vec<_> = siblings.iter().map(|i| i.artifact.segment()).collect();
            let valid = SegmentList::from_segments(dedupe(&reported));
            let Some(extent) = valid.extent() else {
                continue;
            };

            let ifo = DetectorSet::single(det);
            drafts.push(
                JobDraft::new(ifo.clone())
                    .inputs(siblings.iter().map(|i| i.id))
                    .options(request.options_for(Some(det)))
                    .output(
                        OutputSpec::new(self.output, ifo, extent, self.extension)
                            .meta("sibling-count", siblings.len().to_string())
                            .meta("valid-segments", valid.to_string()),
                    ),
            );
        }
        Ok(drafts)
    }
}
