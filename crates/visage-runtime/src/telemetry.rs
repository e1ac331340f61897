//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// Filter from `RUST_LOG`, falling back to the configured directives
pub fn env_filter(config: &LogConfig) -> RuntimeResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| RuntimeError::Telemetry(format!("bad filter {:?}: {e}", config.filter))),
    }
}

/// Install the global subscriber
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &LogConfig) -> RuntimeResult<()> {
    let filter = env_filter(config)?;

    let result = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    };

    result.map_err(|e| RuntimeError::Telemetry(e.to_string()))?;
    tracing::debug!(filter = %config.filter, json = config.json, "tracing initialized");
    Ok(())
}
