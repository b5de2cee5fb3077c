//! Testing utilities for harness users.
//!
//! This module provides:
//! - Assertions over diagnostic reports
//! - Failing fixtures, body counters and mock post-processors

mod assertions;
mod mocks;

pub use assertions::{
    assert_body_failed_with, assert_no_secondary_faults, assert_passed, assert_primary_cause,
    assert_secondary_fault_from, assert_setup_failed,
};
pub use mocks::{BodyCounter, FailingToInitialize, RecordingProcessor, ResultAssumingProcessor};
