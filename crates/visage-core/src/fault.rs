//! Fault link between the per-frame path and the health layer
//!
//! The render tick only increments counters and reads the neutral-override
//! flag. The health layer drains the counters and owns the flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Counters drained by one health sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultCounts {
    /// NaN or out-of-range values clamped in the per-frame path
    pub numeric: u64,
    /// Collaborator failures (clock unavailable, mesh too small)
    pub dependency: u64,
    /// Malformed inputs replaced by silence
    pub malformed_input: u64,
}

impl FaultCounts {
    pub fn total(&self) -> u64 {
        self.numeric + self.dependency + self.malformed_input
    }

    /// Faults the frame path could not resolve locally
    ///
    /// Malformed input already falls back to silence, so it is excluded.
    pub fn unresolved(&self) -> u64 {
        self.numeric + self.dependency
    }
}

#[derive(Debug, Default)]
struct FaultLinkInner {
    numeric: AtomicU64,
    dependency: AtomicU64,
    malformed_input: AtomicU64,
    neutral_override: AtomicBool,
}

/// Shared handle; clones refer to the same counters
#[derive(Debug, Clone, Default)]
pub struct FaultLink {
    inner: Arc<FaultLinkInner>,
}

impl FaultLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_numeric_fault(&self) {
        self.inner.numeric.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dependency_fault(&self) {
        self.inner.dependency.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed_input(&self) {
        self.inner.malformed_input.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counts without resetting
    pub fn peek(&self) -> FaultCounts {
        FaultCounts {
            numeric: self.inner.numeric.load(Ordering::Relaxed),
            dependency: self.inner.dependency.load(Ordering::Relaxed),
            malformed_input: self.inner.malformed_input.load(Ordering::Relaxed),
        }
    }

    /// Read and reset all counters
    pub fn drain(&self) -> FaultCounts {
        FaultCounts {
            numeric: self.inner.numeric.swap(0, Ordering::Relaxed),
            dependency: self.inner.dependency.swap(0, Ordering::Relaxed),
            malformed_input: self.inner.malformed_input.swap(0, Ordering::Relaxed),
        }
    }

    /// Should the per-frame path serve static neutral output?
    pub fn neutral_override(&self) -> bool {
        self.inner.neutral_override.load(Ordering::Acquire)
    }

    pub fn set_neutral_override(&self, enabled: bool) {
        self.inner.neutral_override.store(enabled, Ordering::Release);
    }
}
