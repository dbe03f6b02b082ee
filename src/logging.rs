//! Tracing subscriber setup
//!
//! Log lines go to stderr so that stdout carries only the report.

use crate::config::LoggingConfig;
use crate::error::ReconcileError;
use std::sync::OnceLock;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable that overrides the configured log level
pub const LOG_ENV_VAR: &str = "GAZECHECK_LOG";

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber. Subsequent calls are no-ops.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ReconcileError> {
    if LOGGING_INIT.get().is_some() {
        return Ok(());
    }

    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.log_level.clone());
    let env_filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    let init_result = if config.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    init_result.map_err(|err| ReconcileError::Logging(err.to_string()))?;
    LOGGING_INIT.set(()).ok();

    debug!(level = level.as_str(), json = config.json, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }
}
