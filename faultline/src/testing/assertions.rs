//! Test assertions for diagnostic reports.

use crate::errors::FailureKind;
use crate::report::DiagnosticReport;

/// Asserts that the unit's setup failed.
pub fn assert_setup_failed(report: &DiagnosticReport) {
    assert!(
        report.outcome.is_setup_failed(),
        "Expected setup failure for '{}', got outcome: {}",
        report.unit_id,
        report.outcome
    );
}

/// Asserts that the unit passed.
pub fn assert_passed(report: &DiagnosticReport) {
    assert!(
        report.is_success(),
        "Expected '{}' to pass, got: {}",
        report.unit_id,
        report.render()
    );
}

/// Asserts that the body ran and failed with a message containing `needle`.
pub fn assert_body_failed_with(report: &DiagnosticReport, needle: &str) {
    let error = report
        .outcome
        .body_result()
        .and_then(|r| r.error())
        .unwrap_or_else(|| panic!("Expected body failure, got outcome: {}", report.outcome));
    assert!(
        error.mentions(needle),
        "Expected body failure mentioning '{}', got: {}",
        needle,
        error
    );
}

/// Asserts that the primary cause mentions `needle` and has the given kind.
pub fn assert_primary_cause(report: &DiagnosticReport, kind: FailureKind, needle: &str) {
    let cause = report
        .primary_cause()
        .unwrap_or_else(|| panic!("Expected a primary cause, got outcome: {}", report.outcome));
    assert_eq!(
        cause.kind, kind,
        "Expected primary cause of kind {:?}, got {:?}",
        kind, cause.kind
    );
    assert!(
        cause.mentions(needle),
        "Expected primary cause mentioning '{}', got: {}",
        needle,
        cause
    );
}

/// Asserts that no post-processor faulted.
pub fn assert_no_secondary_faults(report: &DiagnosticReport) {
    assert!(
        !report.has_secondary_faults(),
        "Expected no secondary faults, got: {:?}",
        report.secondary_faults
    );
}

/// Asserts that `processor` faulted and was recorded as secondary.
pub fn assert_secondary_fault_from(report: &DiagnosticReport, processor: &str) {
    assert!(
        report
            .secondary_faults
            .iter()
            .any(|f| f.processor == processor && f.failure.kind == FailureKind::PostProcessing),
        "Expected a secondary fault from '{}', got: {:?}",
        processor,
        report.secondary_faults
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BodyResult, Outcome};
    use crate::errors::Failure;
    use crate::report::SecondaryFault;
    use std::collections::BTreeMap;

    fn setup_failed() -> DiagnosticReport {
        DiagnosticReport::new(
            "unit",
            BTreeMap::new(),
            Outcome::SetupFailed {
                cause: Failure::new(FailureKind::Setup, "FailingToInitialize"),
            },
        )
    }

    #[test]
    fn test_assert_setup_failed() {
        let report = setup_failed();
        assert_setup_failed(&report);
        assert_primary_cause(&report, FailureKind::Setup, "FailingToInitialize");
        assert_no_secondary_faults(&report);
    }

    #[test]
    #[should_panic(expected = "Expected setup failure")]
    fn test_assert_setup_failed_fails() {
        assert_setup_failed(&DiagnosticReport::new("unit", BTreeMap::new(), Outcome::NotRun));
    }

    #[test]
    fn test_assert_body_failed_with() {
        let report = DiagnosticReport::new(
            "unit",
            BTreeMap::new(),
            Outcome::Completed {
                result: BodyResult::Failed(Failure::new(FailureKind::Body, "boom")),
            },
        );
        assert_body_failed_with(&report, "boom");
    }

    #[test]
    #[should_panic(expected = "Expected body failure")]
    fn test_assert_body_failed_with_on_setup_failure() {
        assert_body_failed_with(&setup_failed(), "boom");
    }

    #[test]
    fn test_assert_passed() {
        let report = DiagnosticReport::new(
            "unit",
            BTreeMap::new(),
            Outcome::Completed {
                result: BodyResult::Returned(serde_json::Value::Null),
            },
        );
        assert_passed(&report);
    }

    #[test]
    fn test_assert_secondary_fault_from() {
        let mut report = setup_failed();
        report.push_secondary(
            SecondaryFault::new("legacy", Failure::new(FailureKind::PostProcessing, "npe")),
            4,
        );
        assert_secondary_fault_from(&report, "legacy");
    }

    #[test]
    #[should_panic(expected = "Expected primary cause of kind")]
    fn test_assert_primary_cause_kind_mismatch() {
        assert_primary_cause(&setup_failed(), FailureKind::Body, "FailingToInitialize");
    }
}
