//! Report sink trait and implementations.

use super::DiagnosticReport;
use crate::errors::HarnessError;
use parking_lot::RwLock;
use tracing::{debug, info, warn, Level};

/// The outbound reporting surface.
///
/// Rendering (console, file, exit code) is the host's business; a sink only
/// receives finished reports. The harness logs and suppresses sink errors.
pub trait ReportSink: Send + Sync {
    /// Publishes a finished report.
    fn publish(&self, report: &DiagnosticReport) -> Result<(), HarnessError>;
}

/// A no-op sink that discards all reports.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReportSink;

impl ReportSink for NoOpReportSink {
    fn publish(&self, _report: &DiagnosticReport) -> Result<(), HarnessError> {
        Ok(())
    }
}

/// A sink that logs reports using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingReportSink {
    level: Level,
}

impl Default for LoggingReportSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingReportSink {
    /// Creates a new logging sink with the specified level for passing units.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl ReportSink for LoggingReportSink {
    fn publish(&self, report: &DiagnosticReport) -> Result<(), HarnessError> {
        if report.primary_cause().is_some() || report.has_secondary_faults() {
            warn!(
                unit_id = %report.unit_id,
                outcome = report.outcome.label(),
                secondary = report.secondary_faults.len(),
                "{}",
                report.render()
            );
            return Ok(());
        }

        if self.level == Level::DEBUG {
            debug!(unit_id = %report.unit_id, outcome = report.outcome.label(), "{}", report.headline());
        } else {
            info!(unit_id = %report.unit_id, outcome = report.outcome.label(), "{}", report.headline());
        }
        Ok(())
    }
}

/// A collecting sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingReportSink {
    reports: RwLock<Vec<DiagnosticReport>>,
}

impl CollectingReportSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected reports.
    #[must_use]
    pub fn reports(&self) -> Vec<DiagnosticReport> {
        self.reports.read().clone()
    }

    /// Returns the number of collected reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    /// Returns true if no reports have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }

    /// Clears all collected reports.
    pub fn clear(&self) {
        self.reports.write().clear();
    }

    /// Returns the report for a unit, if one was published.
    #[must_use]
    pub fn find(&self, unit_id: &str) -> Option<DiagnosticReport> {
        self.reports
            .read()
            .iter()
            .find(|r| r.unit_id == unit_id)
            .cloned()
    }
}

impl ReportSink for CollectingReportSink {
    fn publish(&self, report: &DiagnosticReport) -> Result<(), HarnessError> {
        self.reports.write().push(report.clone());
        Ok(())
    }
}
