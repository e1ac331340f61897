//! Health Service - runs the health monitor beside the render loop
//!
//! Three jobs on their own intervals: health sweeps, latency samples and
//! the alert sweep. The monitor sits behind a mutex so the host can read a
//! report at any time; the render loop never takes that lock.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use visage_animation::AvatarAnimator;
use visage_core::{FaultLink, VisageError, VisageResult};
use visage_health::{Alert, AlertSeverity, HealthMonitor, HealthReport};

use crate::config::{CadenceConfig, VisageConfig};

/// Build a live animator and a health service that share one fault link
pub fn assemble(config: &VisageConfig) -> VisageResult<(AvatarAnimator, HealthService)> {
    config.validate()?;
    let faults = FaultLink::new();
    let animator = AvatarAnimator::with_fault_link(config.animator.clone(), faults.clone());
    let monitor = HealthMonitor::new(config.health.clone(), config.animator.clone(), faults);
    Ok((animator, HealthService::new(monitor, config.cadence.clone())))
}

/// Background health monitoring
pub struct HealthService {
    monitor: Arc<Mutex<HealthMonitor>>,
    cadence: CadenceConfig,
    alert_sink: Option<mpsc::UnboundedSender<Alert>>,
}

impl HealthService {
    pub fn new(monitor: HealthMonitor, cadence: CadenceConfig) -> Self {
        Self {
            monitor: Arc::new(Mutex::new(monitor)),
            cadence,
            alert_sink: None,
        }
    }

    /// Forward alerts to the host in addition to logging them
    pub fn with_alert_sink(mut self, sink: mpsc::UnboundedSender<Alert>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    pub fn monitor(&self) -> Arc<Mutex<HealthMonitor>> {
        self.monitor.clone()
    }

    pub fn report(&self) -> HealthReport {
        self.monitor.lock().report(Instant::now())
    }

    /// `CircuitOpen` while the avatar is held at neutral
    pub fn guard(&self) -> VisageResult<()> {
        if self.monitor.lock().breaker().is_open() {
            return Err(VisageError::CircuitOpen);
        }
        Ok(())
    }

    /// Start the jobs on the current tokio runtime
    pub fn spawn(self) -> HealthServiceHandle {
        let (shutdown, signal) = watch::channel(false);
        let monitor = self.monitor.clone();
        let task = tokio::spawn(run(self.monitor, self.cadence, self.alert_sink, signal));
        tracing::info!("health service started");
        HealthServiceHandle {
            monitor,
            shutdown,
            task,
        }
    }
}

/// Handle to a running health service
pub struct HealthServiceHandle {
    monitor: Arc<Mutex<HealthMonitor>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HealthServiceHandle {
    pub fn report(&self) -> HealthReport {
        self.monitor.lock().report(Instant::now())
    }

    pub fn monitor(&self) -> Arc<Mutex<HealthMonitor>> {
        self.monitor.clone()
    }

    /// Signal the jobs to stop and wait for them
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "health service task ended abnormally");
        }
        tracing::info!("health service stopped");
    }
}

async fn run(
    monitor: Arc<Mutex<HealthMonitor>>,
    cadence: CadenceConfig,
    alert_sink: Option<mpsc::UnboundedSender<Alert>>,
    mut signal: watch::Receiver<bool>,
) {
    let mut checks = interval(cadence.health_checks);
    let mut performance = interval(cadence.performance);
    let mut alerts = interval(cadence.alert_sweep);
    for timer in [&mut checks, &mut performance, &mut alerts] {
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }

    loop {
        tokio::select! {
            _ = checks.tick() => {
                let failed = monitor
                    .lock()
                    .run_health_checks(Instant::now())
                    .iter()
                    .filter(|o| !o.passed)
                    .count();
                tracing::debug!(failed, "health sweep complete");
            }
            _ = performance.tick() => {
                if let Some(outcome) = monitor.lock().sample_performance() {
                    tracing::debug!(passed = outcome.passed, detail = %outcome.detail, "latency sample");
                }
            }
            _ = alerts.tick() => {
                let raised = monitor.lock().sweep_alerts();
                for alert in raised {
                    log_alert(&alert);
                    if let Some(sink) = &alert_sink {
                        let _ = sink.send(alert);
                    }
                }
            }
            changed = signal.changed() => {
                if changed.is_err() || *signal.borrow() {
                    break;
                }
            }
        }
    }
}

fn log_alert(alert: &Alert) {
    let behavior = alert.behavior.map(|b| b.name()).unwrap_or("pipeline");
    match alert.severity {
        AlertSeverity::Critical => tracing::error!(
            behavior,
            remediation = ?alert.remediation,
            "{}", alert.message
        ),
        AlertSeverity::Warning => tracing::warn!(
            behavior,
            remediation = ?alert.remediation,
            "{}", alert.message
        ),
        AlertSeverity::Info => tracing::info!(behavior, "{}", alert.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use visage_health::{BreakerStatus, HealthStatus};

    fn fast_config() -> VisageConfig {
        let mut config = VisageConfig {
            cadence: CadenceConfig {
                health_checks: Duration::from_millis(20),
                performance: Duration::from_millis(50),
                alert_sweep: Duration::from_millis(10),
            },
            ..VisageConfig::default()
        };
        // Unoptimized test builds
        config.health.performance.budget = Duration::from_millis(50);
        config
    }

    #[test]
    fn test_assemble_shares_fault_link() {
        let (animator, service) = assemble(&VisageConfig::default()).unwrap();

        animator.fault_link().record_numeric_fault();
        let monitor = service.monitor();
        assert_eq!(monitor.lock().fault_link().peek().numeric, 1);
        assert!(service.guard().is_ok());
    }

    #[test]
    fn test_assemble_rejects_invalid_config() {
        let mut config = VisageConfig::default();
        config.health.breaker.failure_threshold = 0;
        assert!(assemble(&config).is_err());
    }

    #[tokio::test]
    async fn test_service_runs_sweeps() {
        let (_animator, service) = assemble(&fast_config()).unwrap();
        let handle = service.spawn();

        tokio::time::sleep(Duration::from_millis(120)).await;
        let report = handle.report();
        assert!(report.sweeps >= 1);
        assert_eq!(report.breaker, BreakerStatus::Closed);
        // Latency depends on the machine; the sweep behaviors do not
        for behavior in ["accuracy", "fallback", "cross_rig", "runtime_faults"] {
            assert_eq!(report.behaviors[behavior].status, HealthStatus::Healthy, "{behavior}");
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_alerts_forwarded() {
        let (animator, service) = assemble(&fast_config()).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = service.with_alert_sink(tx).spawn();

        animator.fault_link().record_dependency_fault();
        let alert = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alert.severity, AlertSeverity::Warning);

        handle.shutdown().await;
    }
}
