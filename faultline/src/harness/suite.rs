//! Running several units and summarising them.

use super::runner::FailureCapturingHarness;
use crate::core::Outcome;
use crate::errors::{Failure, FailureKind};
use crate::report::{DiagnosticReport, SecondaryFault};
use crate::unit::UnitOfWork;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSummary {
    /// Units executed.
    pub total: usize,
    /// Units whose body returned normally.
    pub passed: usize,
    /// Units whose body failed.
    pub failed: usize,
    /// Units whose setup failed.
    pub setup_failed: usize,
    /// Units that never reached a terminal state.
    pub not_run: usize,
    /// Units carrying at least one secondary fault.
    pub with_secondary_faults: usize,
}

/// Reports for a group of units, in the order the units were given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// The suite name.
    pub name: String,
    /// One report per unit.
    pub reports: Vec<DiagnosticReport>,
}

impl SuiteReport {
    /// Creates a new suite report.
    #[must_use]
    pub fn new(name: impl Into<String>, reports: Vec<DiagnosticReport>) -> Self {
        Self {
            name: name.into(),
            reports,
        }
    }

    /// Computes outcome counts.
    #[must_use]
    pub fn summary(&self) -> SuiteSummary {
        let mut summary = SuiteSummary {
            total: self.reports.len(),
            ..SuiteSummary::default()
        };

        for report in &self.reports {
            match &report.outcome {
                Outcome::NotRun => summary.not_run += 1,
                Outcome::SetupFailed { .. } => summary.setup_failed += 1,
                Outcome::Completed { result } if result.is_ok() => summary.passed += 1,
                Outcome::Completed { .. } => summary.failed += 1,
            }
            if report.has_secondary_faults() {
                summary.with_secondary_faults += 1;
            }
        }

        summary
    }

    /// Returns true if every unit passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.reports.iter().all(DiagnosticReport::is_success)
    }

    /// Returns the report for a unit.
    #[must_use]
    pub fn get(&self, unit_id: &str) -> Option<&DiagnosticReport> {
        self.reports.iter().find(|r| r.unit_id == unit_id)
    }

    /// Renders a summary line followed by every non-passing report.
    #[must_use]
    pub fn render(&self) -> String {
        let s = self.summary();
        let mut out = format!(
            "suite {}: {} passed, {} failed, {} setup failed, {} not run",
            self.name, s.passed, s.failed, s.setup_failed, s.not_run
        );
        for report in self.reports.iter().filter(|r| !r.is_success()) {
            let _ = write!(out, "\n{}", report.render());
        }
        out
    }
}

impl FailureCapturingHarness {
    /// Runs units one after another, each with its own outcome.
    pub fn run_suite<F>(
        &self,
        name: impl Into<String>,
        units: impl IntoIterator<Item = UnitOfWork<F>>,
    ) -> SuiteReport {
        let suite = SuiteReport::new(name, units.into_iter().map(|unit| self.run(unit)).collect());
        log_summary(&suite);
        suite
    }

    /// Runs every unit on its own blocking task.
    ///
    /// Units share nothing but the harness itself. Reports come back in input
    /// order. A panic escaping a unit (only possible with panic capture off)
    /// is resumed on the caller.
    pub async fn run_concurrent<F: 'static>(
        self: &Arc<Self>,
        name: impl Into<String>,
        units: Vec<UnitOfWork<F>>,
    ) -> SuiteReport {
        let mut pending = Vec::with_capacity(units.len());
        for unit in units {
            let id = unit.id().to_string();
            let tags = unit.tags().clone();
            let harness = Arc::clone(self);
            pending.push((id, tags, tokio::task::spawn_blocking(move || harness.run(unit))));
        }

        let mut reports = Vec::with_capacity(pending.len());
        for (id, tags, handle) in pending {
            let report = match handle.await {
                Ok(report) => report,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => {
                    warn!(unit_id = %id, error = %err, "Unit task did not finish");
                    let mut report = DiagnosticReport::new(id, tags, Outcome::NotRun);
                    report.push_secondary(
                        SecondaryFault::new(
                            "harness",
                            Failure::new(FailureKind::PostProcessing, err.to_string()),
                        ),
                        self.config().max_secondary_faults,
                    );
                    report
                }
            };
            reports.push(report);
        }

        let suite = SuiteReport::new(name, reports);
        log_summary(&suite);
        suite
    }
}

fn log_summary(suite: &SuiteReport) {
    let s = suite.summary();
    info!(
        suite = %suite.name,
        total = s.total,
        passed = s.passed,
        failed = s.failed,
        setup_failed = s.setup_failed,
        "Suite finished"
    );
}
