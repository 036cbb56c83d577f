use std::cell::Cell;

use coincflow::artifact::OutputSpec;
use coincflow::errors::Result;
use coincflow::graph::{JobDraft, StageFactory, StageRequest};

/// Wraps a stage factory and counts how often it is asked to plan.
///
/// Memoized invocations never reach the factory, so the count tells a
/// test whether the builder planned or reused.
pub struct CountingStage<F> {
    inner: F,
    calls: Cell<usize>,
}

impl<F> CountingStage<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl<F: StageFactory> StageFactory for CountingStage<F> {
    fn stage(&self) -> &str {
        self.inner.stage()
    }

    fn fingerprint(&self) -> String {
        self.inner.fingerprint()
    }

    fn plan(&self, request: &StageRequest<'_>) -> Result<Vec<JobDraft>> {
        self.calls.set(self.calls.get() + 1);
        self.inner.plan(request)
    }
}

/// A single combined job with a fixed number of outputs `OUT0..OUTn`.
pub struct FanOutStage {
    stage: String,
    outputs: usize,
}

impl FanOutStage {
    pub fn new(stage: &str, outputs: usize) -> Self {
        Self {
            stage: stage.to_string(),
            outputs,
        }
    }
}

impl StageFactory for FanOutStage {
    fn stage(&self) -> &str {
        &self.stage
    }

    fn fingerprint(&self) -> String {
        format!("outputs={}", self.outputs)
    }

    fn plan(&self, request: &StageRequest<'_>) -> Result<Vec<JobDraft>> {
        let mut draft = JobDraft::new(request.detectors.clone()).inputs(request.input_ids());
        for i in 0..self.outputs {
            draft = draft.output(OutputSpec::new(
                format!("OUT{i}"),
                request.detectors.clone(),
                request.span,
                "dat",
            ));
        }
        Ok(vec![draft])
    }
}
