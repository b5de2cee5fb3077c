//! The failure-capturing harness.
//!
//! A unit runs `setup -> (body | skip) -> post-processing`. The recorded
//! outcome is the only source of the primary cause; anything that goes wrong
//! while post-processing is attached to the report as a secondary fault.

mod async_runner;
mod integration_tests;
mod runner;
mod suite;

pub use async_runner::AsyncUnitOfWork;
pub use runner::FailureCapturingHarness;
pub use suite::{SuiteReport, SuiteSummary};
