//! Post-processor chain for ordered outcome inspection.

use crate::core::Outcome;
use crate::errors::{capture, Failure, FailureKind};
use crate::report::SecondaryFault;
use crate::unit::UnitContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// An auxiliary action a post-processor decided on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// What was done (e.g. "rollback").
    pub action: String,
    /// Why.
    pub reason: String,
}

impl Decision {
    /// Creates a new decision.
    #[must_use]
    pub fn new(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// Logic that runs around a unit and inspects its recorded outcome.
///
/// `after` receives the outcome by shared reference; it can observe it but
/// never replace it. Errors and panics from either hook are caught by the
/// chain.
pub trait PostProcessor: Send + Sync {
    /// Returns the processor name used in reports.
    fn name(&self) -> &str;

    /// Returns the processor's priority (lower = earlier `before`, later `after`).
    fn priority(&self) -> i32 {
        0
    }

    /// Called before setup. A failure here counts as a setup failure.
    fn before(&self, _ctx: &UnitContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once the unit reached a terminal state.
    fn after(&self, ctx: &UnitContext, outcome: &Outcome) -> anyhow::Result<Option<Decision>>;
}

/// Decisions and faults collected from one `after` pass.
#[derive(Debug, Default)]
pub struct ChainOutput {
    /// Decisions keyed by processor name.
    pub decisions: BTreeMap<String, Decision>,
    /// Faults raised by processors, in the order they ran.
    pub faults: Vec<SecondaryFault>,
}

/// A chain of post-processors.
pub struct PostProcessorChain {
    processors: Vec<Arc<dyn PostProcessor>>,
}

impl PostProcessorChain {
    /// Creates a new empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    /// Adds a processor to the chain.
    pub fn add(&mut self, processor: Arc<dyn PostProcessor>) {
        self.processors.push(processor);
        self.processors.sort_by_key(|p| p.priority());
    }

    /// Runs every `before` hook in priority order.
    ///
    /// Stops at the first fault and returns it as a setup failure.
    pub fn run_before(&self, ctx: &UnitContext) -> Result<(), Failure> {
        for processor in &self.processors {
            capture(FailureKind::Setup, true, || processor.before(ctx)).map_err(|failure| {
                failure.with_cause(format!(
                    "raised by post-processor '{}' before setup",
                    processor.name()
                ))
            })?;
        }
        Ok(())
    }

    /// Runs every `after` hook in reverse priority order.
    ///
    /// A faulting processor never stops the others.
    pub fn run_after(&self, ctx: &UnitContext, outcome: &Outcome) -> ChainOutput {
        let mut output = ChainOutput::default();

        for processor in self.processors.iter().rev() {
            let name = processor.name().to_string();
            match capture(FailureKind::PostProcessing, true, || processor.after(ctx, outcome)) {
                Ok(Some(decision)) => {
                    output.decisions.insert(name, decision);
                }
                Ok(None) => {}
                Err(failure) => {
                    warn!(
                        unit_id = ctx.unit_id(),
                        processor = %name,
                        error = %failure.message,
                        "Post-processor faulted; recorded as secondary"
                    );
                    output.faults.push(SecondaryFault::new(name, failure));
                }
            }
        }

        output
    }

    /// Returns the number of processors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Returns true if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl Default for PostProcessorChain {
    fn default() -> Self {
        Self::new()
    }
}
