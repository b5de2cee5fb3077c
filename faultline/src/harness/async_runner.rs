//! Async host adapter.
//!
//! The setup future is awaited to completion and its result recorded before
//! the body future is even constructed, so a suspension point can never let
//! the body start after a failed setup.

use super::runner::{transition, FailureCapturingHarness};
use crate::core::{BodyResult, Outcome, PhaseTracker, UnitPhase};
use crate::errors::{Failure, FailureKind};
use crate::observability::PhaseTimer;
use crate::postprocess::TransactionMode;
use crate::report::DiagnosticReport;
use crate::unit::{UnitContext, TRANSACTION_TAG};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info_span, warn, Instrument};

type AsyncBodyFn<F> =
    Box<dyn FnOnce(F) -> BoxFuture<'static, anyhow::Result<serde_json::Value>> + Send>;

/// A unit of work whose phases are futures.
pub struct AsyncUnitOfWork<F> {
    id: String,
    tags: BTreeMap<String, String>,
    setup: BoxFuture<'static, anyhow::Result<F>>,
    body: AsyncBodyFn<F>,
}

impl<F: Send + 'static> AsyncUnitOfWork<F> {
    /// Creates a new async unit.
    pub fn new<S, B, Fut>(id: impl Into<String>, setup: S, body: B) -> Self
    where
        S: Future<Output = anyhow::Result<F>> + Send + 'static,
        B: FnOnce(F) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        Self {
            id: id.into(),
            tags: BTreeMap::new(),
            setup: setup.boxed(),
            body: Box::new(move |fixture| body(fixture).boxed()),
        }
    }

    /// Adds a descriptive tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Requests a transaction mode for this unit.
    #[must_use]
    pub fn transactional(self, mode: TransactionMode) -> Self {
        self.with_tag(TRANSACTION_TAG, mode.to_string())
    }

    /// Returns the unit identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<F> Debug for AsyncUnitOfWork<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncUnitOfWork")
            .field("id", &self.id)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

async fn capture_async<T>(
    kind: FailureKind,
    catch_panics: bool,
    fut: BoxFuture<'static, anyhow::Result<T>>,
) -> Result<T, Failure> {
    if !catch_panics {
        return fut.await.map_err(|err| Failure::from_anyhow(kind, &err));
    }

    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Failure::from_anyhow(kind, &err)),
        Err(payload) => Err(Failure::from_panic(kind, payload.as_ref())),
    }
}

impl FailureCapturingHarness {
    /// Runs one async unit to a terminal state and reports on it.
    pub async fn run_async<F: Send + 'static>(&self, unit: AsyncUnitOfWork<F>) -> DiagnosticReport {
        let AsyncUnitOfWork {
            id,
            tags,
            setup,
            body,
        } = unit;
        let ctx = UnitContext::new(id, tags);
        let span = info_span!("unit", unit_id = ctx.unit_id(), run_id = %ctx.run_id());

        async {
            let outcome = match AssertUnwindSafe(self.execute_async(&ctx, setup, body))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(payload) => self.release_and_resume(&ctx, payload),
            };
            self.finish(&ctx, outcome)
        }
        .instrument(span)
        .await
    }

    async fn execute_async<F: Send + 'static>(
        &self,
        ctx: &UnitContext,
        setup: BoxFuture<'static, anyhow::Result<F>>,
        body: AsyncBodyFn<F>,
    ) -> Outcome {
        let catch_panics = self.config().capture_panics;
        let mut phases = PhaseTracker::new(ctx.unit_id());
        transition(&mut phases, UnitPhase::SettingUp);

        let timer = PhaseTimer::start(UnitPhase::SettingUp);
        let fixture = match self.chain().run_before(ctx) {
            Ok(()) => capture_async(FailureKind::Setup, catch_panics, setup).await,
            Err(cause) => Err(cause),
        };
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
        // The body closure runs inside the guarded future, not before it.
        let body_future = async move { body(fixture).await }.boxed();
        let result = match capture_async(FailureKind::Body, catch_panics, body_future).await {
            Ok(value) => BodyResult::Returned(value),
            Err(failure) => BodyResult::Failed(failure),
        };
        transition(&mut phases, UnitPhase::Completed);
        debug!(duration_ms = timer.finish(), passed = result.is_ok(), "Body completed");

        Outcome::Completed { result }
    }
}
