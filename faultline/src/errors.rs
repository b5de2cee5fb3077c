//! Error types for the faultline harness.
//!
//! Two layers live here. [`HarnessError`] covers faults of the harness
//! machinery itself (configuration, sinks, transactions, phase bookkeeping).
//! [`Failure`] is the captured, serializable form of whatever went wrong inside
//! a unit of work, tagged with the [`FailureKind`] that produced it.

use crate::core::UnitPhase;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

/// The main error type for harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A unit tried to move between phases in an order the lifecycle forbids.
    #[error("Illegal phase transition for unit '{unit}': {from} -> {to}")]
    IllegalTransition {
        /// The unit identifier.
        unit: String,
        /// The phase the unit was in.
        from: UnitPhase,
        /// The phase that was requested.
        to: UnitPhase,
    },

    /// A transaction manager could not begin, commit or roll back.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A report sink refused a report.
    #[error("Report sink error: {0}")]
    Sink(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The logging subscriber could not be installed.
    #[error("Logging error: {0}")]
    Logging(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which part of a unit's lifecycle produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The setup phase failed before the body could run.
    Setup,
    /// The body ran and failed.
    Body,
    /// Auxiliary logic that inspects the outcome failed.
    PostProcessing,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup failure"),
            Self::Body => write!(f, "body failure"),
            Self::PostProcessing => write!(f, "post-processing failure"),
        }
    }
}

/// A captured failure.
///
/// `message` is the outermost error message (or the panic payload) and
/// `chain` holds the underlying causes, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Where the failure came from.
    pub kind: FailureKind,
    /// The failure message.
    pub message: String,
    /// Underlying causes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
    /// Whether the failure was a panic rather than a returned error.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub panicked: bool,
}

impl Failure {
    /// Creates a new failure with no cause chain.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            chain: Vec::new(),
            panicked: false,
        }
    }

    /// Captures an `anyhow` error together with its source chain.
    #[must_use]
    pub fn from_anyhow(kind: FailureKind, error: &anyhow::Error) -> Self {
        Self {
            kind,
            message: error.to_string(),
            chain: error.chain().skip(1).map(ToString::to_string).collect(),
            panicked: false,
        }
    }

    /// Captures a panic payload.
    #[must_use]
    pub fn from_panic(kind: FailureKind, payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_string()
        };

        Self {
            kind,
            message,
            chain: Vec::new(),
            panicked: true,
        }
    }

    /// Appends a cause to the chain.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.chain.push(cause.into());
        self
    }

    /// Returns true if the message or any cause contains `needle`.
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        self.message.contains(needle) || self.chain.iter().any(|c| c.contains(needle))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.panicked {
            write!(f, "{} (panicked): {}", self.kind, self.message)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

/// Runs `f`, turning both a returned error and (when `catch_panics` is set) a
/// panic into a [`Failure`] of the given kind.
pub(crate) fn capture<T>(
    kind: FailureKind,
    catch_panics: bool,
    f: impl FnOnce() -> anyhow::Result<T>,
) -> Result<T, Failure> {
    if !catch_panics {
        return f().map_err(|err| Failure::from_anyhow(kind, &err));
    }

    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Failure::from_anyhow(kind, &err)),
        Err(payload) => Err(Failure::from_panic(kind, payload.as_ref())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_failure_from_anyhow_keeps_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("constructor threw"))
            .context("bean construction failed: FailingToInitialize")
            .unwrap_err();

        let failure = Failure::from_anyhow(FailureKind::Setup, &err);
        assert_eq!(failure.message, "bean construction failed: FailingToInitialize");
        assert_eq!(failure.chain, vec!["constructor threw".to_string()]);
        assert!(!failure.panicked);
        assert!(failure.mentions("constructor"));
    }

    #[test]
    fn test_failure_from_str_panic() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let failure = Failure::from_panic(FailureKind::Body, payload.as_ref());
        assert_eq!(failure.message, "boom");
        assert!(failure.panicked);
    }

    #[test]
    fn test_failure_from_string_panic() {
        let payload: Box<dyn Any + Send> = Box::new(format!("value was {}", 3));
        let failure = Failure::from_panic(FailureKind::Body, payload.as_ref());
        assert_eq!(failure.message, "value was 3");
    }

    #[test]
    fn test_failure_from_opaque_panic() {
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        let failure = Failure::from_panic(FailureKind::PostProcessing, payload.as_ref());
        assert_eq!(failure.message, "<non-string panic payload>");
    }

    #[test]
    fn test_failure_display() {
        let failure = Failure::new(FailureKind::Setup, "no bean");
        assert_eq!(failure.to_string(), "setup failure: no bean");

        let mut panicked = Failure::new(FailureKind::Body, "boom");
        panicked.panicked = true;
        assert_eq!(panicked.to_string(), "body failure (panicked): boom");
    }

    #[test]
    fn test_capture_returned_error() {
        let result: Result<(), Failure> =
            capture(FailureKind::Setup, true, || anyhow::bail!("missing dependency"));
        let failure = result.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Setup);
        assert_eq!(failure.message, "missing dependency");
    }

    #[test]
    fn test_capture_panic() {
        let result: Result<(), Failure> = capture(FailureKind::Body, true, || panic!("boom"));
        let failure = result.unwrap_err();
        assert!(failure.panicked);
        assert_eq!(failure.message, "boom");
    }

    #[test]
    fn test_capture_ok() {
        let result = capture(FailureKind::Body, true, || Ok(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn test_capture_without_panic_catching_still_maps_errors() {
        let result: Result<(), Failure> = capture(FailureKind::Body, false, || {
            Err(anyhow::anyhow!("io")).context("reading fixture")
        });
        let failure = result.unwrap_err();
        assert_eq!(failure.message, "reading fixture");
        assert_eq!(failure.chain, vec!["io".to_string()]);
    }

    #[test]
    fn test_failure_kind_serialize() {
        let json = serde_json::to_string(&FailureKind::PostProcessing).unwrap();
        assert_eq!(json, r#""post_processing""#);
    }
}
