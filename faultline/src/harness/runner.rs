//! The synchronous harness.

use crate::config::HarnessConfig;
use crate::core::{BodyResult, Outcome, PhaseTracker, UnitPhase};
use crate::errors::{capture, FailureKind};
use crate::observability::PhaseTimer;
use crate::postprocess::{PostProcessor, PostProcessorChain, TransactionManager, TransactionalPostProcessor};
use crate::report::{DiagnosticReport, NoOpReportSink, ReportSink};
use crate::unit::{BodyFn, SetupFn, UnitContext, UnitOfWork};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info_span, warn};

/// Runs units of work and reports on them.
///
/// Setup failures short-circuit the body, the recorded outcome is never
/// overwritten, and post-processing faults only ever land in the report as
/// secondary faults.
pub struct FailureCapturingHarness {
    config: HarnessConfig,
    chain: PostProcessorChain,
    sink: Arc<dyn ReportSink>,
}

impl FailureCapturingHarness {
    /// Creates a harness with no post-processors and a no-op sink.
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            chain: PostProcessorChain::new(),
            sink: Arc::new(NoOpReportSink),
        }
    }

    /// Adds a post-processor.
    #[must_use]
    pub fn with_post_processor(mut self, processor: Arc<dyn PostProcessor>) -> Self {
        self.chain.add(processor);
        self
    }

    /// Wraps every unit in a transaction from `manager`, using the configured
    /// default mode for untagged units.
    #[must_use]
    pub fn with_transactions(self, manager: Arc<dyn TransactionManager>) -> Self {
        let mode = self.config.default_transaction_mode;
        self.with_post_processor(Arc::new(TransactionalPostProcessor::new(manager, mode)))
    }

    /// Sets the report sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs one unit to a terminal state and reports on it.
    pub fn run<F>(&self, unit: UnitOfWork<F>) -> DiagnosticReport {
        let (ctx, setup, body) = unit.into_parts();
        let span = info_span!("unit", unit_id = ctx.unit_id(), run_id = %ctx.run_id());
        let _guard = span.enter();

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.execute(&ctx, setup, body))) {
            Ok(outcome) => outcome,
            Err(payload) => self.release_and_resume(&ctx, payload),
        };
        self.finish(&ctx, outcome)
    }

    fn execute<F>(&self, ctx: &UnitContext, setup: SetupFn<F>, body: BodyFn<F>) -> Outcome {
        let mut phases = PhaseTracker::new(ctx.unit_id());
        transition(&mut phases, UnitPhase::SettingUp);

        let timer = PhaseTimer::start(UnitPhase::SettingUp);
        let fixture = self
            .chain
            .run_before(ctx)
            .and_then(|()| capture(FailureKind::Setup, self.config.capture_panics, setup));
        let fixture = match fixture {
            Ok(fixture) => fixture,
            Err(cause) => {
                transition(&mut phases, UnitPhase::SetupFailed);
                warn!(duration_ms = timer.finish(), cause = %cause.message, "Setup failed; body skipped");
                return Outcome::SetupFailed { cause };
            }
        };
        debug!(duration_ms = timer.finish(), "Setup completed");

        transition(&mut phases, UnitPhase::BodyRunning);
        let timer = PhaseTimer::start(UnitPhase::BodyRunning);
        let result = match capture(FailureKind::Body, self.config.capture_panics, move || body(fixture)) {
            Ok(value) => BodyResult::Returned(value),
            Err(failure) => BodyResult::Failed(failure),
        };
        transition(&mut phases, UnitPhase::Completed);
        debug!(duration_ms = timer.finish(), passed = result.is_ok(), "Body completed");

        Outcome::Completed { result }
    }

    /// Post-processes a terminal outcome and publishes the report.
    pub(crate) fn finish(&self, ctx: &UnitContext, outcome: Outcome) -> DiagnosticReport {
        let output = self.chain.run_after(ctx, &outcome);

        let mut report = DiagnosticReport::new(ctx.unit_id(), ctx.tags().clone(), outcome);
        for (processor, decision) in output.decisions {
            report.record_decision(processor, decision);
        }
        for fault in output.faults {
            report.push_secondary(fault, self.config.max_secondary_faults);
        }

        if let Err(err) = self.sink.publish(&report) {
            warn!(error = %err, "Report sink rejected report");
        }
        report
    }

    /// Runs post-processing for a unit whose panic escaped capture, then
    /// resumes the panic. No report is produced.
    pub(crate) fn release_and_resume(&self, ctx: &UnitContext, payload: Box<dyn Any + Send>) -> ! {
        error!("Unit panicked with capture disabled; releasing post-processing before unwinding");
        let output = self.chain.run_after(ctx, &Outcome::NotRun);
        for (processor, decision) in &output.decisions {
            debug!(processor = %processor, action = %decision.action, "Decision taken while unwinding");
        }
        panic::resume_unwind(payload)
    }

    pub(crate) fn chain(&self) -> &PostProcessorChain {
        &self.chain
    }
}

pub(crate) fn transition(phases: &mut PhaseTracker, next: UnitPhase) {
    if let Err(err) = phases.advance(next) {
        error!(error = %err, "Lifecycle bookkeeping out of order");
    }
}
