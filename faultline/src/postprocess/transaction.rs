//! Transaction handling around units of work.
//!
//! [`TransactionalPostProcessor`] opens a transaction before setup and decides
//! in `after` whether to commit or roll it back. The decision is made by
//! [`rollback_required`], which matches every [`Outcome`] variant explicitly: a unit whose
//! setup failed has no test result to read, so it gets a rollback of whatever
//! was opened instead of a lookup that assumes the body ran.

use super::chain::{Decision, PostProcessor};
use crate::core::{BodyResult, Outcome};
use crate::errors::HarnessError;
use crate::unit::{UnitContext, TRANSACTION_TAG};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// How a unit's transaction ends when the body passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionMode {
    /// Commit on success.
    #[default]
    Commit,
    /// Always roll back, keeping shared state clean between units.
    Rollback,
    /// No transaction at all.
    Disabled,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Rollback => write!(f, "rollback"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for TransactionMode {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commit" => Ok(Self::Commit),
            "rollback" => Ok(Self::Rollback),
            "disabled" => Ok(Self::Disabled),
            other => Err(HarnessError::Config(format!(
                "unknown transaction mode '{other}'"
            ))),
        }
    }
}

/// What should happen to a unit's transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackDecision {
    /// Commit the transaction.
    Commit,
    /// Roll the transaction back.
    Rollback,
    /// Leave it alone (none was opened).
    NoAction,
}

impl fmt::Display for RollbackDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Rollback => write!(f, "rollback"),
            Self::NoAction => write!(f, "none"),
        }
    }
}

/// Decides how an open transaction ends, given the recorded outcome.
///
/// Every [`Outcome`] variant is matched. Only a body that actually returned
/// can lead to a commit.
#[must_use]
pub fn rollback_required(mode: TransactionMode, outcome: &Outcome) -> RollbackDecision {
    decision_with_reason(mode, outcome).0
}

fn decision_with_reason(mode: TransactionMode, outcome: &Outcome) -> (RollbackDecision, &'static str) {
    match (mode, outcome) {
        (TransactionMode::Disabled, _) => (RollbackDecision::NoAction, "transactions disabled"),
        (_, Outcome::NotRun) => (RollbackDecision::Rollback, "unit did not run"),
        (_, Outcome::SetupFailed { .. }) => (RollbackDecision::Rollback, "setup failed"),
        (_, Outcome::Completed { result: BodyResult::Failed(_) }) => {
            (RollbackDecision::Rollback, "body failed")
        }
        (TransactionMode::Rollback, Outcome::Completed { result: BodyResult::Returned(_) }) => {
            (RollbackDecision::Rollback, "rollback mode requested")
        }
        (TransactionMode::Commit, Outcome::Completed { result: BodyResult::Returned(_) }) => {
            (RollbackDecision::Commit, "body passed")
        }
    }
}

/// Backend that owns the actual transactions.
#[cfg_attr(test, mockall::automock)]
pub trait TransactionManager: Send + Sync {
    /// Opens a transaction for the run.
    fn begin(&self, ctx: &UnitContext) -> Result<(), HarnessError>;

    /// Commits the run's transaction.
    fn commit(&self, ctx: &UnitContext) -> Result<(), HarnessError>;

    /// Rolls back the run's transaction.
    fn rollback(&self, ctx: &UnitContext) -> Result<(), HarnessError>;
}

/// A transaction manager event recorded by [`InMemoryTransactionManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionEvent {
    /// A transaction was opened.
    Begin(String),
    /// A transaction was committed.
    Commit(String),
    /// A transaction was rolled back.
    Rollback(String),
}

/// Transaction manager that records calls in memory.
#[derive(Debug, Default)]
pub struct InMemoryTransactionManager {
    events: Mutex<Vec<TransactionEvent>>,
    open: Mutex<HashSet<Uuid>>,
}

impl InMemoryTransactionManager {
    /// Creates a new manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<TransactionEvent> {
        self.events.lock().clone()
    }

    /// Returns the number of transactions still open.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.lock().len()
    }

    fn close(&self, ctx: &UnitContext, event: TransactionEvent) -> Result<(), HarnessError> {
        if !self.open.lock().remove(&ctx.run_id()) {
            return Err(HarnessError::Transaction(format!(
                "no open transaction for unit '{}'",
                ctx.unit_id()
            )));
        }
        self.events.lock().push(event);
        Ok(())
    }
}

impl TransactionManager for InMemoryTransactionManager {
    fn begin(&self, ctx: &UnitContext) -> Result<(), HarnessError> {
        if !self.open.lock().insert(ctx.run_id()) {
            return Err(HarnessError::Transaction(format!(
                "transaction already open for unit '{}'",
                ctx.unit_id()
            )));
        }
        self.events
            .lock()
            .push(TransactionEvent::Begin(ctx.unit_id().to_string()));
        Ok(())
    }

    fn commit(&self, ctx: &UnitContext) -> Result<(), HarnessError> {
        self.close(ctx, TransactionEvent::Commit(ctx.unit_id().to_string()))
    }

    fn rollback(&self, ctx: &UnitContext) -> Result<(), HarnessError> {
        self.close(ctx, TransactionEvent::Rollback(ctx.unit_id().to_string()))
    }
}

/// Post-processor that wraps each unit in a transaction.
///
/// The mode comes from the unit's `transaction` tag, falling back to the
/// processor default.
pub struct TransactionalPostProcessor {
    manager: Arc<dyn TransactionManager>,
    default_mode: TransactionMode,
    active: Mutex<HashSet<Uuid>>,
}

impl TransactionalPostProcessor {
    /// Processor name used in reports.
    pub const NAME: &'static str = "transaction";

    /// Creates a new processor.
    #[must_use]
    pub fn new(manager: Arc<dyn TransactionManager>, default_mode: TransactionMode) -> Self {
        Self {
            manager,
            default_mode,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Resolves the mode for a unit.
    pub fn mode_for(&self, ctx: &UnitContext) -> anyhow::Result<TransactionMode> {
        match ctx.tag(TRANSACTION_TAG) {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(self.default_mode),
        }
    }
}

impl PostProcessor for TransactionalPostProcessor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        -100
    }

    fn before(&self, ctx: &UnitContext) -> anyhow::Result<()> {
        if self.mode_for(ctx)? == TransactionMode::Disabled {
            return Ok(());
        }
        self.manager.begin(ctx)?;
        self.active.lock().insert(ctx.run_id());
        debug!(unit_id = ctx.unit_id(), "Transaction opened");
        Ok(())
    }

    fn after(&self, ctx: &UnitContext, outcome: &Outcome) -> anyhow::Result<Option<Decision>> {
        // Nothing was opened for this run, either by mode or because `before` failed.
        if !self.active.lock().remove(&ctx.run_id()) {
            return Ok(None);
        }
        let mode = self.mode_for(ctx).unwrap_or(TransactionMode::Disabled);
        let (decision, reason) = decision_with_reason(mode, outcome);

        match decision {
            RollbackDecision::Commit => self.manager.commit(ctx)?,
            RollbackDecision::Rollback => self.manager.rollback(ctx)?,
            RollbackDecision::NoAction => return Ok(None),
        }

        info!(
            unit_id = ctx.unit_id(),
            outcome = outcome.label(),
            %decision,
            reason,
            "Transaction closed"
        );
        Ok(Some(Decision::new(decision.to_string(), reason)))
    }
}
