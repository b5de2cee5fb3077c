//! Subscriber installation.

use crate::config::LoggingConfig;
use crate::errors::HarnessError;
use tracing_subscriber::EnvFilter;

/// Builds the filter for a logging configuration.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, HarnessError> {
    EnvFilter::try_new(&config.level)
        .map_err(|e| HarnessError::Logging(format!("invalid filter '{}': {e}", config.level)))
}

/// Installs the global `tracing` subscriber.
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), HarnessError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| HarnessError::Logging(e.to_string()))
}
