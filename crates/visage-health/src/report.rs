//! Health reports and alerts for operators

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use visage_core::FaultCounts;

use crate::breaker::BreakerStatus;
use crate::registry::{Behavior, BehaviorRecord, HealthStatus};

/// Point-in-time view of the health layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall: HealthStatus,
    /// Keyed by behavior name
    pub behaviors: BTreeMap<String, BehaviorRecord>,
    pub breaker: BreakerStatus,
    pub breaker_failures: u32,
    /// Time left before the breaker may probe, while open
    pub cool_down_remaining: Option<Duration>,
    /// Per-frame path forced to neutral output
    pub neutral_override: bool,
    /// Faults drained from the per-frame path since startup
    pub faults: FaultCounts,
    pub sweeps: u64,
    pub history_len: usize,
}

impl HealthReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn is_healthy(&self) -> bool {
        self.overall == HealthStatus::Healthy && self.breaker == BreakerStatus::Closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// Something an operator should know about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: AlertSeverity,
    /// None for pipeline-wide alerts (breaker changes)
    pub behavior: Option<Behavior>,
    pub message: String,
    pub remediation: Vec<String>,
}

impl Alert {
    /// Alert for a behavior whose status changed
    pub fn for_behavior(behavior: Behavior, from: HealthStatus, record: &BehaviorRecord) -> Self {
        let severity = match record.status {
            HealthStatus::Unhealthy => AlertSeverity::Critical,
            HealthStatus::Degraded if from == HealthStatus::Healthy => AlertSeverity::Warning,
            _ => AlertSeverity::Info,
        };
        let detail = record.last_detail.as_deref().unwrap_or("no detail");
        Self {
            severity,
            behavior: Some(behavior),
            message: format!("{behavior} {from} -> {}: {detail}", record.status),
            remediation: record.remediation.clone(),
        }
    }

    /// Alert for a breaker state change
    pub fn for_breaker(from: BreakerStatus, to: BreakerStatus) -> Self {
        let (severity, remediation) = match to {
            BreakerStatus::Open => (
                AlertSeverity::Critical,
                vec![
                    "avatar output is held at neutral".to_string(),
                    "inspect unhealthy behaviors in the health report".to_string(),
                ],
            ),
            BreakerStatus::HalfOpen => (AlertSeverity::Warning, Vec::new()),
            BreakerStatus::Closed => (AlertSeverity::Info, Vec::new()),
        };
        Self {
            severity,
            behavior: None,
            message: format!("circuit breaker {from} -> {to}"),
            remediation,
        }
    }
}
