//! The recorded outcome of a unit of work.

use crate::errors::Failure;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the body of a unit produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyResult {
    /// The body returned a value.
    Returned(serde_json::Value),
    /// The body returned an error or panicked.
    Failed(Failure),
}

impl BodyResult {
    /// Returns true if the body returned normally.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Returned(_))
    }

    /// Returns the body failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&Failure> {
        match self {
            Self::Returned(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Returns the returned value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Returned(value) => Some(value),
            Self::Failed(_) => None,
        }
    }
}

/// Exactly one outcome is recorded per execution of a unit.
///
/// Once `SetupFailed` is recorded the body never runs and the cause is never
/// replaced. Code inspecting an outcome must handle all three variants; the
/// `Completed`-only accessors return `Option` for that reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// The unit never reached a terminal state.
    NotRun,
    /// Setup failed; the body was skipped.
    SetupFailed {
        /// The root cause.
        cause: Failure,
    },
    /// Setup succeeded and the body ran to completion.
    Completed {
        /// What the body produced.
        result: BodyResult,
    },
}

impl Default for Outcome {
    fn default() -> Self {
        Self::NotRun
    }
}

impl Outcome {
    /// Returns true if setup failed.
    #[must_use]
    pub fn is_setup_failed(&self) -> bool {
        matches!(self, Self::SetupFailed { .. })
    }

    /// Returns true if the body ran.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Returns true if the body ran and returned normally.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { result } if result.is_ok())
    }

    /// Returns the setup cause, if setup failed.
    #[must_use]
    pub fn setup_cause(&self) -> Option<&Failure> {
        match self {
            Self::SetupFailed { cause } => Some(cause),
            Self::NotRun | Self::Completed { .. } => None,
        }
    }

    /// Returns the body result; `None` unless the body ran.
    #[must_use]
    pub fn body_result(&self) -> Option<&BodyResult> {
        match self {
            Self::Completed { result } => Some(result),
            Self::NotRun | Self::SetupFailed { .. } => None,
        }
    }

    /// Returns the failure a user should see first.
    #[must_use]
    pub fn primary_cause(&self) -> Option<&Failure> {
        match self {
            Self::NotRun => None,
            Self::SetupFailed { cause } => Some(cause),
            Self::Completed { result } => result.error(),
        }
    }

    /// Returns a short label for the outcome.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotRun => "not_run",
            Self::SetupFailed { .. } => "setup_failed",
            Self::Completed { result } if result.is_ok() => "passed",
            Self::Completed { .. } => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
