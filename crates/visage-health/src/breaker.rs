//! Circuit breaker for the animation pipeline
//!
//! - Closed → Open: after N consecutive failures
//! - Open → HalfOpen: cool-down elapsed and a probe succeeded
//! - HalfOpen → Closed: a further success
//! - HalfOpen → Open: any failure
//!
//! `record_failure` and `attempt_recovery` are the only mutators.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use visage_core::{VisageError, VisageResult};

/// Breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Minimum time open before a probe may half-open
    pub cool_down: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cool_down: Duration::from_secs(60),
        }
    }
}

impl BreakerConfig {
    pub fn validate(&self) -> VisageResult<()> {
        if self.failure_threshold == 0 {
            return Err(VisageError::InvalidConfig(
                "failure_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open { opened_at: Instant },
    HalfOpen,
}

/// Serializable view of the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerStatus {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for BreakerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Pipeline circuit breaker
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: BreakerState,
    consecutive_failures: u32,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: BreakerState::Closed,
            consecutive_failures: 0,
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn status(&self) -> BreakerStatus {
        match self.state {
            BreakerState::Closed => BreakerStatus::Closed,
            BreakerState::Open { .. } => BreakerStatus::Open,
            BreakerState::HalfOpen => BreakerStatus::HalfOpen,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, BreakerState::Open { .. })
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Time left before a probe may half-open the breaker
    pub fn cool_down_remaining(&self, now: Instant) -> Option<Duration> {
        match self.state {
            BreakerState::Open { opened_at } => {
                Some(self.config.cool_down.saturating_sub(now.saturating_duration_since(opened_at)))
            }
            _ => None,
        }
    }

    /// Count a failure; returns the resulting status
    pub fn record_failure(&mut self, now: Instant) -> BreakerStatus {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        match self.state {
            BreakerState::Closed => {
                if self.consecutive_failures >= self.config.failure_threshold {
                    self.state = BreakerState::Open { opened_at: now };
                }
            }
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open { opened_at: now };
            }
            // Already open; the cool-down keeps running from the first opening
            BreakerState::Open { .. } => {}
        }
        self.status()
    }

    /// Report a success or a probe result; returns the resulting status
    ///
    /// While open, nothing changes until the cool-down has elapsed. A failed
    /// probe after the cool-down restarts it.
    pub fn attempt_recovery(&mut self, now: Instant, probe_ok: bool) -> BreakerStatus {
        match self.state {
            BreakerState::Closed => {
                if probe_ok {
                    self.consecutive_failures = 0;
                } else {
                    return self.record_failure(now);
                }
            }
            BreakerState::Open { .. } => {
                if self.cool_down_remaining(now) == Some(Duration::ZERO) {
                    self.state = if probe_ok {
                        BreakerState::HalfOpen
                    } else {
                        BreakerState::Open { opened_at: now }
                    };
                }
            }
            BreakerState::HalfOpen => {
                if probe_ok {
                    self.state = BreakerState::Closed;
                    self.consecutive_failures = 0;
                } else {
                    return self.record_failure(now);
                }
            }
        }
        self.status()
    }
}
