//! # Faultline
//!
//! A harness for units of work whose setup can fail before their body runs.
//!
//! When a dependency cannot be constructed, the body is skipped and the setup
//! failure is recorded as the unit's outcome. Post-processing (for example a
//! rollback decision) still runs afterwards, but it only ever sees the outcome
//! by shared reference, and whatever it throws is attached to the report as a
//! secondary fault. The original cause stays the headline.
//!
//! - **Units of work**: fallible setup producing a fixture, body consuming it
//! - **Outcomes**: `NotRun`, `SetupFailed`, `Completed`, matched exhaustively
//! - **Post-processing**: ordered processors, isolated from one another
//! - **Transactions**: commit/rollback decided from every outcome variant
//! - **Reports**: deterministic, renderable, published to a sink
//!
//! ## Quick Start
//!
//! ```rust
//! use faultline::prelude::*;
//! use std::sync::Arc;
//!
//! let harness = FailureCapturingHarness::new(HarnessConfig::default())
//!     .with_transactions(Arc::new(InMemoryTransactionManager::new()));
//!
//! let unit = UnitOfWork::new(
//!     "needs_bean",
//!     || -> anyhow::Result<()> { anyhow::bail!("bean construction failed") },
//!     |()| Ok(serde_json::json!(null)),
//! )
//! .transactional(TransactionMode::Rollback);
//!
//! let report = harness.run(unit);
//! assert!(report.outcome.is_setup_failed());
//! assert!(report.headline().contains("bean construction failed"));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod harness;
pub mod observability;
pub mod postprocess;
pub mod report;
pub mod testing;
pub mod unit;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{HarnessConfig, LoggingConfig};
    pub use crate::core::{BodyResult, Outcome, UnitPhase};
    pub use crate::errors::{Failure, FailureKind, HarnessError};
    pub use crate::harness::{AsyncUnitOfWork, FailureCapturingHarness, SuiteReport, SuiteSummary};
    pub use crate::observability::init_logging;
    pub use crate::postprocess::{
        Decision, InMemoryTransactionManager, PostProcessor, TransactionManager, TransactionMode,
        TransactionalPostProcessor,
    };
    pub use crate::report::{
        CollectingReportSink, DiagnosticReport, LoggingReportSink, NoOpReportSink, ReportSink,
        SecondaryFault,
    };
    pub use crate::unit::{UnitContext, UnitOfWork};
}
