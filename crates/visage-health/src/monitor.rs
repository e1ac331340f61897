//! Health Monitor - owns the registry, the breaker and the validators
//!
//! Sweeps are driven from outside (a service task or a test) with an
//! explicit `now`, so the breaker's cool-down is testable without sleeping.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use visage_animation::AnimatorConfig;
use visage_core::{FaultCounts, FaultLink, VisageResult};

use crate::breaker::{BreakerConfig, BreakerStatus, CircuitBreaker};
use crate::registry::{Behavior, CheckOutcome, HealthRegistry, HealthStatus, RegistryConfig};
use crate::report::{Alert, HealthReport};
use crate::validate::{PerformanceConfig, ValidationSuite};

/// Health layer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub registry: RegistryConfig,
    pub breaker: BreakerConfig,
    pub performance: PerformanceConfig,
}

impl HealthConfig {
    pub fn validate(&self) -> VisageResult<()> {
        self.registry.validate()?;
        self.breaker.validate()?;
        self.performance.validate()?;
        Ok(())
    }
}

/// Self-monitoring for one animation pipeline
#[derive(Debug)]
pub struct HealthMonitor {
    registry: HealthRegistry,
    breaker: CircuitBreaker,
    suite: ValidationSuite,
    faults: FaultLink,
    cumulative: FaultCounts,
    sweeps: u64,
    alerted: BTreeMap<Behavior, HealthStatus>,
    alerted_breaker: BreakerStatus,
}

impl HealthMonitor {
    /// `faults` must be the link given to the live animator
    pub fn new(config: HealthConfig, animator: AnimatorConfig, faults: FaultLink) -> Self {
        Self {
            registry: HealthRegistry::new(config.registry),
            breaker: CircuitBreaker::new(config.breaker),
            suite: ValidationSuite::new(animator, config.performance),
            faults,
            cumulative: FaultCounts::default(),
            sweeps: 0,
            alerted: BTreeMap::new(),
            alerted_breaker: BreakerStatus::Closed,
        }
    }

    pub fn registry(&self) -> &HealthRegistry {
        &self.registry
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn suite(&self) -> &ValidationSuite {
        &self.suite
    }

    pub fn fault_link(&self) -> &FaultLink {
        &self.faults
    }

    /// One health sweep
    ///
    /// While the breaker is open only the recovery probe runs. Otherwise a
    /// sweep with any failing outcome counts as one breaker failure and a
    /// clean sweep as one success.
    pub fn run_health_checks(&mut self, now: Instant) -> Vec<CheckOutcome> {
        self.sweeps += 1;
        let runtime = self.runtime_faults();
        let before = self.breaker.status();

        let outcomes = if self.breaker.is_open() {
            let probe = self.suite.probe();
            let probe_ok = runtime.passed && probe.passed;
            tracing::debug!(probe_ok, detail = %probe.detail, "breaker recovery probe");
            self.breaker.attempt_recovery(now, probe_ok);
            vec![runtime, probe]
        } else {
            let outcomes = vec![
                runtime,
                self.suite.accuracy(),
                self.suite.fallback(),
                self.suite.cross_rig(),
            ];
            if outcomes.iter().all(|o| o.passed) {
                self.breaker.attempt_recovery(now, true);
            } else {
                self.breaker.record_failure(now);
            }
            outcomes
        };

        for outcome in &outcomes {
            self.registry.record(outcome.clone());
        }

        self.log_breaker_change(before);
        self.faults.set_neutral_override(self.breaker.is_open());
        outcomes
    }

    /// Latency sample; skipped while the breaker is open
    pub fn sample_performance(&mut self) -> Option<CheckOutcome> {
        if self.breaker.is_open() {
            return None;
        }
        let outcome = self.suite.performance();
        self.registry.record(outcome.clone());
        Some(outcome)
    }

    /// Alerts for every status change since the previous sweep
    pub fn sweep_alerts(&mut self) -> Vec<Alert> {
        let mut alerts = Vec::new();

        for (behavior, record) in self.registry.records() {
            let previous = self
                .alerted
                .insert(behavior, record.status)
                .unwrap_or_default();
            if previous != record.status {
                alerts.push(Alert::for_behavior(behavior, previous, record));
            }
        }

        let status = self.breaker.status();
        if status != self.alerted_breaker {
            alerts.push(Alert::for_breaker(self.alerted_breaker, status));
            self.alerted_breaker = status;
        }

        alerts
    }

    pub fn report(&self, now: Instant) -> HealthReport {
        HealthReport {
            overall: self.registry.overall(),
            behaviors: self
                .registry
                .records()
                .map(|(b, r)| (b.name().to_string(), r.clone()))
                .collect(),
            breaker: self.breaker.status(),
            breaker_failures: self.breaker.consecutive_failures(),
            cool_down_remaining: self.breaker.cool_down_remaining(now),
            neutral_override: self.faults.neutral_override(),
            faults: self.cumulative,
            sweeps: self.sweeps,
            history_len: self.registry.history_len(),
        }
    }

    /// Drain per-frame fault counters into an outcome
    fn runtime_faults(&mut self) -> CheckOutcome {
        let drained = self.faults.drain();
        self.cumulative.numeric += drained.numeric;
        self.cumulative.dependency += drained.dependency;
        self.cumulative.malformed_input += drained.malformed_input;

        // Malformed input already animates as silence; it is reported but
        // never fails the check or feeds the breaker
        if drained.unresolved() == 0 {
            if drained.malformed_input == 0 {
                return CheckOutcome::pass(Behavior::RuntimeFaults, "no runtime faults");
            }
            tracing::info!(
                malformed_input = drained.malformed_input,
                "malformed phoneme input resolved as silence"
            );
            return CheckOutcome::pass(
                Behavior::RuntimeFaults,
                format!("malformed_input={} resolved locally", drained.malformed_input),
            );
        }

        let mut remediation = Vec::new();
        if drained.numeric > 0 {
            remediation.push("check emotion and prosody inputs for NaN or out-of-range values");
        }
        if drained.dependency > 0 {
            remediation.push("check the audio clock and the avatar mesh");
        }
        if drained.malformed_input > 0 {
            remediation.push("check phoneme sequences from speech synthesis");
        }
        CheckOutcome::fail(
            Behavior::RuntimeFaults,
            format!(
                "numeric={} dependency={} malformed_input={}",
                drained.numeric, drained.dependency, drained.malformed_input
            ),
            &remediation,
        )
    }

    fn log_breaker_change(&self, before: BreakerStatus) {
        let after = self.breaker.status();
        if after == before {
            return;
        }
        match after {
            BreakerStatus::Open => tracing::error!(
                failures = self.breaker.consecutive_failures(),
                cool_down = ?self.breaker.config().cool_down,
                "circuit breaker opened, avatar output held at neutral"
            ),
            BreakerStatus::HalfOpen => tracing::warn!("circuit breaker half-open, probing recovery"),
            BreakerStatus::Closed => tracing::info!("circuit breaker closed, animation resumed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn monitor() -> (HealthMonitor, FaultLink) {
        let faults = FaultLink::new();
        let monitor = HealthMonitor::new(
            HealthConfig::default(),
            AnimatorConfig::default(),
            faults.clone(),
        );
        (monitor, faults)
    }

    #[test]
    fn test_clean_sweep() {
        let (mut monitor, faults) = monitor();
        let outcomes = monitor.run_health_checks(Instant::now());

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|o| o.passed));
        assert_eq!(monitor.registry().overall(), HealthStatus::Healthy);
        assert!(!faults.neutral_override());
    }

    #[test]
    fn test_runtime_faults_degrade() {
        let (mut monitor, faults) = monitor();
        faults.record_dependency_fault();

        monitor.run_health_checks(Instant::now());
        assert_eq!(
            monitor.registry().status(Behavior::RuntimeFaults),
            HealthStatus::Degraded
        );
        assert_eq!(monitor.breaker().consecutive_failures(), 1);
        assert_eq!(faults.peek().total(), 0);

        let report = monitor.report(Instant::now());
        assert_eq!(report.faults.dependency, 1);
    }

    #[test]
    fn test_breaker_opens_and_recovers() {
        let (mut monitor, faults) = monitor();
        let start = Instant::now();

        for _ in 0..5 {
            faults.record_numeric_fault();
            monitor.run_health_checks(start);
        }
        assert_eq!(monitor.breaker().status(), BreakerStatus::Open);
        assert!(faults.neutral_override());
        assert_eq!(
            monitor.registry().status(Behavior::RuntimeFaults),
            HealthStatus::Unhealthy
        );

        // Within the cool-down only the probe runs and nothing changes
        let outcomes = monitor.run_health_checks(start + Duration::from_secs(30));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(monitor.breaker().status(), BreakerStatus::Open);
        assert!(monitor.sample_performance().is_none());

        let later = start + Duration::from_secs(61);
        monitor.run_health_checks(later);
        assert_eq!(monitor.breaker().status(), BreakerStatus::HalfOpen);
        assert!(!faults.neutral_override());

        monitor.run_health_checks(later);
        assert_eq!(monitor.breaker().status(), BreakerStatus::Closed);
        assert!(!faults.neutral_override());
    }

    #[test]
    fn test_malformed_input_never_trips_breaker() {
        let (mut monitor, faults) = monitor();
        let start = Instant::now();

        for _ in 0..5 {
            faults.record_malformed_input();
            let outcomes = monitor.run_health_checks(start);
            assert!(outcomes.iter().all(|o| o.passed));
        }
        assert_eq!(monitor.breaker().status(), BreakerStatus::Closed);
        assert_eq!(monitor.breaker().consecutive_failures(), 0);
        assert!(!faults.neutral_override());
        assert_eq!(
            monitor.registry().status(Behavior::RuntimeFaults),
            HealthStatus::Healthy
        );

        let report = monitor.report(start);
        assert_eq!(report.faults.malformed_input, 5);
        assert!(report.behaviors["runtime_faults"]
            .last_detail
            .as_deref()
            .unwrap()
            .contains("malformed_input=1"));
    }

    #[test]
    fn test_alerts_on_change_only() {
        let (mut monitor, faults) = monitor();
        let now = Instant::now();

        monitor.run_health_checks(now);
        assert!(monitor.sweep_alerts().is_empty());

        faults.record_numeric_fault();
        monitor.run_health_checks(now);
        let alerts = monitor.sweep_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].behavior, Some(Behavior::RuntimeFaults));
        assert!(!alerts[0].remediation.is_empty());

        assert!(monitor.sweep_alerts().is_empty());
    }

    #[test]
    fn test_report() {
        let (mut monitor, _) = monitor();
        monitor.run_health_checks(Instant::now());

        let report = monitor.report(Instant::now());
        assert!(report.is_healthy());
        assert_eq!(report.sweeps, 1);
        assert_eq!(report.history_len, 4);
        assert_eq!(report.behaviors.len(), Behavior::ALL.len());
        assert!(report.to_json().contains("\"breaker\": \"closed\""));
    }

    #[test]
    fn test_config_validation() {
        assert!(HealthConfig::default().validate().is_ok());
        let mut config = HealthConfig::default();
        config.breaker.failure_threshold = 0;
        assert!(config.validate().is_err());
    }
}
