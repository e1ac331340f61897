//! Health Registry - per-behavior status with bounded history
//!
//! Owned by the monitor and injected where needed; there is no global.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use visage_core::{VisageError, VisageResult};

/// A monitored behavior of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    /// Outputs bounded and repeatable
    Accuracy,
    /// Per-calculation latency within budget
    Performance,
    /// Degraded dependencies still yield valid output
    Fallback,
    /// Every rig class yields bounded, comparable output
    CrossRig,
    /// Faults counted by the per-frame path since the last sweep
    RuntimeFaults,
}

impl Behavior {
    pub const ALL: [Behavior; 5] = [
        Behavior::Accuracy,
        Behavior::Performance,
        Behavior::Fallback,
        Behavior::CrossRig,
        Behavior::RuntimeFaults,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Behavior::Accuracy => "accuracy",
            Behavior::Performance => "performance",
            Behavior::Fallback => "fallback",
            Behavior::CrossRig => "cross_rig",
            Behavior::RuntimeFaults => "runtime_faults",
        }
    }
}

impl std::fmt::Display for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse status of one behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Result of one validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub behavior: Behavior,
    pub passed: bool,
    /// What was checked, or what went wrong
    pub detail: String,
    /// Operator hints when the check failed
    pub remediation: Vec<String>,
    /// How long the check took
    pub elapsed: Duration,
}

impl CheckOutcome {
    pub fn pass(behavior: Behavior, detail: impl Into<String>) -> Self {
        Self {
            behavior,
            passed: true,
            detail: detail.into(),
            remediation: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn fail(behavior: Behavior, detail: impl Into<String>, remediation: &[&str]) -> Self {
        Self {
            behavior,
            passed: false,
            detail: detail.into(),
            remediation: remediation.iter().map(|s| s.to_string()).collect(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

/// Health history of one behavior
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRecord {
    pub status: HealthStatus,
    pub consecutive_failures: u32,
    pub total_checks: u64,
    pub total_failures: u64,
    pub last_detail: Option<String>,
    pub remediation: Vec<String>,
    pub last_checked: Option<SystemTime>,
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Outcomes kept in history
    pub history_capacity: usize,
    /// Consecutive failures before a behavior is unhealthy
    pub escalation_threshold: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            history_capacity: 128,
            escalation_threshold: 3,
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> VisageResult<()> {
        if self.history_capacity == 0 || self.escalation_threshold == 0 {
            return Err(VisageError::InvalidConfig(
                "history_capacity and escalation_threshold must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Health bookkeeping for all behaviors
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    config: RegistryConfig,
    records: BTreeMap<Behavior, BehaviorRecord>,
    history: VecDeque<CheckOutcome>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl HealthRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let records = Behavior::ALL
            .iter()
            .map(|&b| (b, BehaviorRecord::default()))
            .collect();
        Self {
            history: VecDeque::with_capacity(config.history_capacity),
            config,
            records,
        }
    }

    /// Record an outcome; returns the behavior's new status
    ///
    /// Failing: Healthy → Degraded, then Unhealthy after the escalation
    /// threshold. Passing steps back one level at a time.
    pub fn record(&mut self, outcome: CheckOutcome) -> HealthStatus {
        let behavior = outcome.behavior;
        let threshold = self.config.escalation_threshold;
        let record = self.records.entry(behavior).or_default();
        let previous = record.status;

        record.total_checks += 1;
        record.last_checked = Some(SystemTime::now());
        record.last_detail = Some(outcome.detail.clone());

        if outcome.passed {
            record.consecutive_failures = 0;
            record.status = match previous {
                HealthStatus::Unhealthy => HealthStatus::Degraded,
                HealthStatus::Degraded | HealthStatus::Healthy => HealthStatus::Healthy,
            };
            if record.status == HealthStatus::Healthy {
                record.remediation.clear();
            }
        } else {
            record.consecutive_failures += 1;
            record.total_failures += 1;
            record.remediation = outcome.remediation.clone();
            record.status = if record.consecutive_failures >= threshold {
                HealthStatus::Unhealthy
            } else {
                HealthStatus::Degraded
            };
        }

        let status = record.status;
        if status != previous {
            match status {
                HealthStatus::Unhealthy => tracing::error!(
                    %behavior,
                    failures = record.consecutive_failures,
                    detail = %outcome.detail,
                    "behavior unhealthy"
                ),
                HealthStatus::Degraded if previous == HealthStatus::Healthy => tracing::warn!(
                    %behavior,
                    detail = %outcome.detail,
                    "behavior degraded"
                ),
                _ => tracing::info!(%behavior, from = %previous, to = %status, "behavior recovering"),
            }
        } else if !outcome.passed {
            tracing::warn!(%behavior, detail = %outcome.detail, "validation failed");
        }

        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(outcome);

        status
    }

    pub fn status(&self, behavior: Behavior) -> HealthStatus {
        self.records
            .get(&behavior)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    pub fn record_for(&self, behavior: Behavior) -> Option<&BehaviorRecord> {
        self.records.get(&behavior)
    }

    pub fn records(&self) -> impl Iterator<Item = (Behavior, &BehaviorRecord)> {
        self.records.iter().map(|(b, r)| (*b, r))
    }

    /// Worst status across behaviors
    pub fn overall(&self) -> HealthStatus {
        self.records
            .values()
            .map(|r| r.status)
            .max()
            .unwrap_or_default()
    }

    /// Oldest first
    pub fn history(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail(behavior: Behavior) -> CheckOutcome {
        CheckOutcome::fail(behavior, "broken", &["fix it"])
    }

    #[test]
    fn test_starts_healthy() {
        let registry = HealthRegistry::default();
        assert_eq!(registry.overall(), HealthStatus::Healthy);
        assert_eq!(registry.records().count(), Behavior::ALL.len());
    }

    #[test]
    fn test_escalation() {
        let mut registry = HealthRegistry::default();

        assert_eq!(registry.record(fail(Behavior::Accuracy)), HealthStatus::Degraded);
        assert_eq!(registry.record(fail(Behavior::Accuracy)), HealthStatus::Degraded);
        assert_eq!(registry.record(fail(Behavior::Accuracy)), HealthStatus::Unhealthy);
        assert_eq!(registry.overall(), HealthStatus::Unhealthy);
        assert_eq!(registry.status(Behavior::Fallback), HealthStatus::Healthy);

        let record = registry.record_for(Behavior::Accuracy).unwrap();
        assert_eq!(record.remediation, vec!["fix it".to_string()]);
    }

    #[test]
    fn test_recovery_steps_back() {
        let mut registry = HealthRegistry::default();
        for _ in 0..3 {
            registry.record(fail(Behavior::CrossRig));
        }

        let pass = CheckOutcome::pass(Behavior::CrossRig, "ok");
        assert_eq!(registry.record(pass.clone()), HealthStatus::Degraded);
        assert_eq!(registry.record(pass), HealthStatus::Healthy);
        assert!(registry
            .record_for(Behavior::CrossRig)
            .unwrap()
            .remediation
            .is_empty());
    }

    #[test]
    fn test_degraded_recovers_directly() {
        let mut registry = HealthRegistry::default();
        registry.record(fail(Behavior::Performance));
        assert_eq!(
            registry.record(CheckOutcome::pass(Behavior::Performance, "ok")),
            HealthStatus::Healthy
        );
    }

    #[test]
    fn test_history_is_bounded() {
        let mut registry = HealthRegistry::new(RegistryConfig {
            history_capacity: 4,
            ..RegistryConfig::default()
        });
        for i in 0..10 {
            registry.record(CheckOutcome::pass(Behavior::Accuracy, format!("run {i}")));
        }

        assert_eq!(registry.history_len(), 4);
        assert_eq!(registry.history().next().unwrap().detail, "run 6");
        assert_eq!(registry.record_for(Behavior::Accuracy).unwrap().total_checks, 10);
    }
}
