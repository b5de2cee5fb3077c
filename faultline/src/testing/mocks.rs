//! Mock fixtures, bodies and post-processors for testing.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::core::Outcome;
use crate::postprocess::{Decision, PostProcessor};
use crate::unit::UnitContext;

/// A dependency whose constructor always fails.
#[derive(Debug)]
pub struct FailingToInitialize {
    _private: (),
}

impl FailingToInitialize {
    /// Attempts construction. Always fails.
    pub fn new() -> anyhow::Result<Self> {
        Err(anyhow::anyhow!("FailingToInitialize constructor threw")
            .context("CDI bean construction failed: FailingToInitialize"))
    }
}

/// Counts how many times a body actually ran.
#[derive(Debug, Clone, Default)]
pub struct BodyCounter {
    calls: Arc<AtomicUsize>,
}

impl BodyCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one call.
    pub fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the number of recorded calls.
    #[must_use]
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// A post-processor that assumes every unit completed.
///
/// It reads the body result unconditionally, the way a rollback decision
/// written against "the test result" does. Under `NotRun` or `SetupFailed` it
/// panics. Use it to check that such faults stay secondary.
#[derive(Debug, Default)]
pub struct ResultAssumingProcessor;

impl ResultAssumingProcessor {
    /// Processor name used in reports.
    pub const NAME: &'static str = "result-assuming-rollback";
}

impl PostProcessor for ResultAssumingProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[allow(clippy::unwrap_used)]
    fn after(&self, _ctx: &UnitContext, outcome: &Outcome) -> anyhow::Result<Option<Decision>> {
        let result = outcome.body_result().unwrap();
        let action = if result.is_ok() { "commit" } else { "rollback" };
        Ok(Some(Decision::new(action, "inspected test result")))
    }
}

/// A post-processor that records the outcomes it saw.
#[derive(Debug, Default)]
pub struct RecordingProcessor {
    seen: Mutex<Vec<(String, String)>>,
}

impl RecordingProcessor {
    /// Creates a new recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(unit_id, outcome label)` pairs in call order.
    #[must_use]
    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().clone()
    }
}

impl PostProcessor for RecordingProcessor {
    fn name(&self) -> &str {
        "recorder"
    }

    fn after(&self, ctx: &UnitContext, outcome: &Outcome) -> anyhow::Result<Option<Decision>> {
        self.seen
            .lock()
            .push((ctx.unit_id().to_string(), outcome.label().to_string()));
        Ok(None)
    }
}
