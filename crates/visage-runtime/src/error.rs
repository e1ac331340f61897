//! Runtime errors

use thiserror::Error;
use visage_core::VisageError;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Visage(#[from] VisageError),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Telemetry init failed: {0}")]
    Telemetry(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
