//! Diagnostic reports and the sinks they are published to.

mod diagnostic;
mod sink;

pub use diagnostic::{DiagnosticReport, SecondaryFault};
pub use sink::{CollectingReportSink, LoggingReportSink, NoOpReportSink, ReportSink};
