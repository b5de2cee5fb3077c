//! Harness configuration.

use crate::errors::HarnessError;
use crate::postprocess::TransactionMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "FAULTLINE_LOG";

/// Environment variable overriding panic capture (`true`/`false`).
pub const CAPTURE_PANICS_ENV: &str = "FAULTLINE_CAPTURE_PANICS";

/// Configuration for a [`FailureCapturingHarness`](crate::harness::FailureCapturingHarness).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Turn panics in setup and body into recorded failures.
    #[serde(default = "default_capture_panics")]
    pub capture_panics: bool,
    /// Transaction mode for units without a `transaction` tag.
    #[serde(default)]
    pub default_transaction_mode: TransactionMode,
    /// Maximum secondary faults stored per report.
    #[serde(default = "default_max_secondary_faults")]
    pub max_secondary_faults: usize,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_capture_panics() -> bool {
    true
}

fn default_max_secondary_faults() -> usize {
    16
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            capture_panics: default_capture_panics(),
            default_transaction_mode: TransactionMode::default(),
            max_secondary_faults: default_max_secondary_faults(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(raw: &str) -> Result<Self, HarnessError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, HarnessError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, HarnessError> {
        if let Some(level) = lookup(LOG_ENV) {
            self.logging.level = level;
        }
        if let Some(raw) = lookup(CAPTURE_PANICS_ENV) {
            self.capture_panics = raw.trim().parse().map_err(|_| {
                HarnessError::Config(format!("{CAPTURE_PANICS_ENV} must be true or false, got '{raw}'"))
            })?;
        }
        Ok(self)
    }

    /// Sets panic capture.
    #[must_use]
    pub fn with_capture_panics(mut self, capture: bool) -> Self {
        self.capture_panics = capture;
        self
    }

    /// Sets the default transaction mode.
    #[must_use]
    pub fn with_default_transaction_mode(mut self, mode: TransactionMode) -> Self {
        self.default_transaction_mode = mode;
        self
    }

    /// Sets the secondary fault limit.
    #[must_use]
    pub fn with_max_secondary_faults(mut self, limit: usize) -> Self {
        self.max_secondary_faults = limit;
        self
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `faultline=debug`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
