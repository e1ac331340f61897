//! Configuration bundle
//!
//! Every section has defaults, so a host can supply only what it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use visage_animation::AnimatorConfig;
use visage_core::{VisageError, VisageResult};
use visage_health::HealthConfig;

use crate::error::RuntimeResult;

/// How often the health service runs each job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub health_checks: Duration,
    pub performance: Duration,
    pub alert_sweep: Duration,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            health_checks: Duration::from_secs(30),
            performance: Duration::from_secs(60),
            alert_sweep: Duration::from_secs(15),
        }
    }
}

impl CadenceConfig {
    pub fn validate(&self) -> VisageResult<()> {
        if self.health_checks.is_zero() || self.performance.is_zero() || self.alert_sweep.is_zero() {
            return Err(VisageError::InvalidConfig(
                "health service cadences must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Tracing output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set
    pub filter: String,
    /// One JSON object per line instead of human-readable text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "visage=info,warn".to_string(),
            json: false,
        }
    }
}

/// Everything a host configures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisageConfig {
    pub animator: AnimatorConfig,
    pub health: HealthConfig,
    pub cadence: CadenceConfig,
    pub log: LogConfig,
}

impl VisageConfig {
    /// Parse and validate
    pub fn from_json(json: &str) -> RuntimeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> RuntimeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> VisageResult<()> {
        self.animator.validate()?;
        self.health.validate()?;
        self.cadence.validate()?;
        Ok(())
    }
}
