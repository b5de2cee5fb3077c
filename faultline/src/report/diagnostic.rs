//! Diagnostic reports.

use crate::core::Outcome;
use crate::errors::{Failure, HarnessError};
use crate::postprocess::Decision;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A fault raised while composing a report, kept apart from the primary cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryFault {
    /// The post-processor that raised it.
    pub processor: String,
    /// What went wrong.
    pub failure: Failure,
}

impl SecondaryFault {
    /// Creates a new secondary fault.
    #[must_use]
    pub fn new(processor: impl Into<String>, failure: Failure) -> Self {
        Self {
            processor: processor.into(),
            failure,
        }
    }
}

/// The report emitted for each executed unit.
///
/// Carries no timestamps or run ids, so identical units produce identical
/// reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// The unit identifier.
    pub unit_id: String,
    /// Tags copied from the unit.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// The recorded outcome.
    pub outcome: Outcome,
    /// Post-processing decisions keyed by processor name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub decisions: BTreeMap<String, Decision>,
    /// Faults raised during post-processing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_faults: Vec<SecondaryFault>,
    /// Secondary faults beyond the configured limit, counted but not stored.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub suppressed_faults: usize,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl DiagnosticReport {
    /// Creates a report with no decisions or secondary faults.
    #[must_use]
    pub fn new(unit_id: impl Into<String>, tags: BTreeMap<String, String>, outcome: Outcome) -> Self {
        Self {
            unit_id: unit_id.into(),
            tags,
            outcome,
            decisions: BTreeMap::new(),
            secondary_faults: Vec::new(),
            suppressed_faults: 0,
        }
    }

    /// Records a post-processing decision.
    pub fn record_decision(&mut self, processor: impl Into<String>, decision: Decision) {
        self.decisions.insert(processor.into(), decision);
    }

    /// Attaches a secondary fault, keeping at most `limit` of them.
    pub fn push_secondary(&mut self, fault: SecondaryFault, limit: usize) {
        if self.secondary_faults.len() < limit {
            self.secondary_faults.push(fault);
        } else {
            self.suppressed_faults += 1;
        }
    }

    /// Returns the failure a user should see first.
    ///
    /// Always derived from the outcome; secondary faults never take its place.
    #[must_use]
    pub fn primary_cause(&self) -> Option<&Failure> {
        self.outcome.primary_cause()
    }

    /// Returns true if the body ran and returned normally.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Returns true if any post-processor faulted.
    #[must_use]
    pub fn has_secondary_faults(&self) -> bool {
        !self.secondary_faults.is_empty() || self.suppressed_faults > 0
    }

    /// Returns the one-line summary.
    #[must_use]
    pub fn headline(&self) -> String {
        match &self.outcome {
            Outcome::NotRun => format!("{}: not run", self.unit_id),
            Outcome::SetupFailed { cause } => {
                format!("{}: setup failed: {}", self.unit_id, cause.message)
            }
            Outcome::Completed { result } => match result.error() {
                Some(error) => format!("{}: failed: {}", self.unit_id, error.message),
                None => format!("{}: passed", self.unit_id),
            },
        }
    }

    /// Renders the report as text: headline, causes, then secondary faults.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.headline();

        if let Some(cause) = self.primary_cause() {
            for link in &cause.chain {
                let _ = write!(out, "\n  caused by: {link}");
            }
        }
        for (processor, decision) in &self.decisions {
            let _ = write!(
                out,
                "\n  {processor}: {} ({})",
                decision.action, decision.reason
            );
        }
        for fault in &self.secondary_faults {
            let _ = write!(
                out,
                "\n  additionally: {} raised {}",
                fault.processor, fault.failure
            );
        }
        if self.suppressed_faults > 0 {
            let _ = write!(
                out,
                "\n  additionally: {} more secondary fault(s) suppressed",
                self.suppressed_faults
            );
        }

        out
    }

    /// Serializes the report to JSON.
    pub fn to_json(&self) -> Result<String, HarnessError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns a SHA-256 hex digest of the JSON form.
    pub fn fingerprint(&self) -> Result<String, HarnessError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
