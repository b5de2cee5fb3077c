//! End-to-end scenarios for the harness.

#[cfg(test)]
mod tests {
    use crate::config::HarnessConfig;
    use crate::core::{BodyResult, Outcome};
    use crate::errors::FailureKind;
    use crate::harness::{AsyncUnitOfWork, FailureCapturingHarness};
    use crate::postprocess::{
        Decision, InMemoryTransactionManager, PostProcessor, TransactionEvent, TransactionMode,
    };
    use crate::report::{CollectingReportSink, DiagnosticReport};
    use crate::testing::{
        assert_body_failed_with, assert_no_secondary_faults, assert_primary_cause,
        assert_secondary_fault_from, assert_setup_failed, BodyCounter, FailingToInitialize,
        RecordingProcessor, ResultAssumingProcessor,
    };
    use crate::unit::{UnitContext, UnitOfWork};
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;

    /// Refuses every unit before setup.
    struct Gatekeeper;

    impl PostProcessor for Gatekeeper {
        fn name(&self) -> &str {
            "gatekeeper"
        }

        fn before(&self, _ctx: &UnitContext) -> anyhow::Result<()> {
            anyhow::bail!("schema lock unavailable")
        }

        fn after(&self, _ctx: &UnitContext, _outcome: &Outcome) -> anyhow::Result<Option<Decision>> {
            Ok(None)
        }
    }

    fn failing_injection_unit_async(id: &str, counter: &BodyCounter) -> AsyncUnitOfWork<FailingToInitialize> {
        let counter = counter.clone();
        AsyncUnitOfWork::new(id, async { FailingToInitialize::new() }, move |_bean| {
            counter.hit();
            async { anyhow::Ok(json!(null)) }
        })
    }

    fn rollback_events(id: &str) -> Vec<TransactionEvent> {
        vec![
            TransactionEvent::Begin(id.to_string()),
            TransactionEvent::Rollback(id.to_string()),
        ]
    }

    /// A unit whose injected dependency cannot be built and whose body must
    /// never be reached.
    fn failing_injection_unit(id: &str, counter: &BodyCounter) -> UnitOfWork<FailingToInitialize> {
        let counter = counter.clone();
        UnitOfWork::new(id, FailingToInitialize::new, move |_bean| {
            counter.hit();
            panic!("unreachable");
        })
    }

    #[test]
    fn test_setup_failure_is_primary_and_body_never_runs() {
        let counter = BodyCounter::new();
        let harness = FailureCapturingHarness::new(HarnessConfig::default());

        let report = harness.run(failing_injection_unit("shows_original_exception", &counter));

        assert_eq!(counter.count(), 0);
        assert_setup_failed(&report);
        assert_primary_cause(&report, FailureKind::Setup, "FailingToInitialize");
        assert_no_secondary_faults(&report);
    }

    #[test]
    fn test_result_assuming_post_processing_cannot_mask_setup_failure() {
        let counter = BodyCounter::new();
        let harness = FailureCapturingHarness::new(HarnessConfig::default())
            .with_post_processor(Arc::new(ResultAssumingProcessor));

        let report = harness.run(failing_injection_unit("masked_by_rollback", &counter));

        assert_eq!(counter.count(), 0);
        assert_primary_cause(&report, FailureKind::Setup, "FailingToInitialize");
        assert_secondary_fault_from(&report, ResultAssumingProcessor::NAME);
        assert_eq!(report.secondary_faults.len(), 1);
        assert!(report.secondary_faults[0].failure.panicked);

        let rendered = report.render();
        let headline = rendered.lines().next().unwrap();
        assert!(headline.contains("FailingToInitialize"));
        assert!(!headline.contains("unwrap"));
        assert!(rendered.contains("additionally: result-assuming-rollback"));
    }

    #[test]
    fn test_both_methods_of_original_suite_report_injection_failure() {
        let counter = BodyCounter::new();
        let manager = Arc::new(InMemoryTransactionManager::new());
        let sink = Arc::new(CollectingReportSink::new());
        let harness = FailureCapturingHarness::new(HarnessConfig::default())
            .with_transactions(manager.clone())
            .with_post_processor(Arc::new(ResultAssumingProcessor))
            .with_sink(sink.clone());

        let suite = harness.run_suite(
            "NullPointerInTransactionHandler",
            vec![
                failing_injection_unit("shows_original_exception", &counter)
                    .transactional(TransactionMode::Disabled),
                failing_injection_unit("exception_masked_in_transaction_handler", &counter)
                    .transactional(TransactionMode::Rollback),
            ],
        );

        assert_eq!(counter.count(), 0);
        assert_eq!(suite.summary().setup_failed, 2);
        assert_eq!(sink.len(), 2);
        for report in &suite.reports {
            assert_primary_cause(report, FailureKind::Setup, "FailingToInitialize");
        }

        let transactional = suite.get("exception_masked_in_transaction_handler").unwrap();
        assert_eq!(transactional.decisions["transaction"].action, "rollback");
        assert_eq!(
            manager.events(),
            vec![
                TransactionEvent::Begin("exception_masked_in_transaction_handler".to_string()),
                TransactionEvent::Rollback("exception_masked_in_transaction_handler".to_string()),
            ]
        );
        assert_eq!(manager.open_count(), 0);
    }

    #[test]
    fn test_body_assertion_failure_is_completed_error() {
        let harness = FailureCapturingHarness::new(HarnessConfig::default());
        let unit = UnitOfWork::new("asserts", || Ok(1), |n: i32| {
            assert!(n == 2, "boom");
            Ok(json!(n))
        });

        let report = harness.run(unit);

        assert_body_failed_with(&report, "boom");
        match &report.outcome {
            Outcome::Completed {
                result: BodyResult::Failed(error),
            } => assert_eq!(error.message, "boom"),
            other => panic!("expected completed failure, got {other}"),
        }
    }

    #[test]
    fn test_identical_units_produce_identical_reports() {
        let manager = Arc::new(InMemoryTransactionManager::new());
        let harness = FailureCapturingHarness::new(HarnessConfig::default())
            .with_transactions(manager)
            .with_post_processor(Arc::new(ResultAssumingProcessor));

        let run = || -> DiagnosticReport {
            let counter = BodyCounter::new();
            harness.run(failing_injection_unit("same", &counter).transactional(TransactionMode::Rollback))
        };
        let first = run();
        let second = run();

        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }

    #[test]
    fn test_post_processors_see_every_terminal_outcome() {
        let recorder = Arc::new(RecordingProcessor::new());
        let harness = FailureCapturingHarness::new(HarnessConfig::default())
            .with_post_processor(recorder.clone());

        let counter = BodyCounter::new();
        harness.run(failing_injection_unit("broken", &counter));
        harness.run(UnitOfWork::without_setup("fine", || Ok(json!("ok"))));

        assert_eq!(
            recorder.seen(),
            vec![
                ("broken".to_string(), "setup_failed".to_string()),
                ("fine".to_string(), "passed".to_string()),
            ]
        );
    }

    #[test]
    fn test_commit_mode_commits_passing_body() {
        let manager = Arc::new(InMemoryTransactionManager::new());
        let harness = FailureCapturingHarness::new(
            HarnessConfig::default().with_default_transaction_mode(TransactionMode::Commit),
        )
        .with_transactions(manager.clone());

        let report = harness.run(UnitOfWork::without_setup("writes", || Ok(json!({"rows": 1}))));

        assert!(report.is_success());
        assert_eq!(report.decisions["transaction"].action, "commit");
        assert_eq!(
            manager.events().last(),
            Some(&TransactionEvent::Commit("writes".to_string()))
        );
    }

    #[test]
    fn test_unknown_transaction_tag_fails_setup_without_running_body() {
        let counter = BodyCounter::new();
        let body_counter = counter.clone();
        let manager = Arc::new(InMemoryTransactionManager::new());
        let harness = FailureCapturingHarness::new(HarnessConfig::default())
            .with_transactions(manager.clone());

        let unit = UnitOfWork::without_setup("mistagged", move || {
            body_counter.hit();
            Ok(json!(null))
        })
        .with_tag("transaction", "eventually");
        let report = harness.run(unit);

        assert_eq!(counter.count(), 0);
        assert_primary_cause(&report, FailureKind::Setup, "unknown transaction mode");
        assert!(manager.events().is_empty());
        assert_no_secondary_faults(&report);
    }

    #[tokio::test]
    async fn test_async_setup_failure_survives_result_assuming_rollback() {
        let counter = BodyCounter::new();
        let manager = Arc::new(InMemoryTransactionManager::new());
        let harness = FailureCapturingHarness::new(HarnessConfig::default())
            .with_transactions(manager.clone())
            .with_post_processor(Arc::new(ResultAssumingProcessor));

        let unit = failing_injection_unit_async("async_masked", &counter).transactional(TransactionMode::Rollback);
        let report = harness.run_async(unit).await;

        assert_eq!(counter.count(), 0);
        assert_primary_cause(&report, FailureKind::Setup, "FailingToInitialize");
        assert_secondary_fault_from(&report, ResultAssumingProcessor::NAME);
        assert_eq!(report.decisions["transaction"].action, "rollback");
        assert_eq!(manager.events(), rollback_events("async_masked"));
        assert_eq!(manager.open_count(), 0);
    }

    #[tokio::test]
    async fn test_async_before_hook_fault_is_setup_failure() {
        let counter = BodyCounter::new();
        let setup_polled = BodyCounter::new();
        let polled = setup_polled.clone();
        let body_counter = counter.clone();
        let harness = FailureCapturingHarness::new(HarnessConfig::default())
            .with_post_processor(Arc::new(Gatekeeper));

        let unit = AsyncUnitOfWork::new(
            "gated",
            async move {
                polled.hit();
                anyhow::Ok(())
            },
            move |()| {
                body_counter.hit();
                async { anyhow::Ok(json!(null)) }
            },
        );
        let report = harness.run_async(unit).await;

        assert_eq!(setup_polled.count(), 0);
        assert_eq!(counter.count(), 0);
        assert_setup_failed(&report);
        assert_primary_cause(&report, FailureKind::Setup, "schema lock unavailable");
        assert!(report.primary_cause().unwrap().mentions("gatekeeper"));
        assert_no_secondary_faults(&report);
    }

    #[tokio::test]
    async fn test_async_uncaptured_panic_rolls_back_before_unwinding() {
        let manager = Arc::new(InMemoryTransactionManager::new());
        let sink = Arc::new(CollectingReportSink::new());
        let harness = FailureCapturingHarness::new(HarnessConfig::default().with_capture_panics(false))
            .with_transactions(manager.clone())
            .with_sink(sink.clone());

        let unit = AsyncUnitOfWork::new("async_native", async { anyhow::Ok(1_u8) }, |n: u8| async move {
            tokio::task::yield_now().await;
            assert_eq!(n, 2, "boom");
            anyhow::Ok(json!(n))
        })
        .transactional(TransactionMode::Rollback);

        let escaped = AssertUnwindSafe(harness.run_async(unit)).catch_unwind().await;

        assert!(escaped.is_err());
        assert_eq!(manager.events(), rollback_events("async_native"));
        assert_eq!(manager.open_count(), 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_uncaptured_setup_panic_reaches_every_processor() {
        let recorder = Arc::new(RecordingProcessor::new());
        let manager = Arc::new(InMemoryTransactionManager::new());
        let harness = FailureCapturingHarness::new(HarnessConfig::default().with_capture_panics(false))
            .with_transactions(manager.clone())
            .with_post_processor(recorder.clone());

        let unit = UnitOfWork::new(
            "native_setup",
            || -> anyhow::Result<u8> { panic!("constructor exploded") },
            |n| Ok(json!(n)),
        );
        let escaped = panic::catch_unwind(AssertUnwindSafe(|| harness.run(unit)));

        assert!(escaped.is_err());
        assert_eq!(
            recorder.seen(),
            vec![("native_setup".to_string(), "not_run".to_string())]
        );
        assert_eq!(manager.events(), rollback_events("native_setup"));
    }
}
