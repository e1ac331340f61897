//! VISAGE Health - Self-monitoring for the animation pipeline
//!
//! Runs on its own slow cadence, never inside the render tick:
//! - Validators exercise the pipeline with synthetic inputs
//! - A registry tracks per-behavior status with bounded history
//! - One circuit breaker switches the per-frame path to neutral output
//!   after repeated failures and probes for recovery after a cool-down
//! - Reports and alerts are produced for operators
//!
//! The only state shared with the per-frame path is the `FaultLink`.

pub mod breaker;
pub mod monitor;
pub mod registry;
pub mod report;
pub mod validate;

pub use breaker::*;
pub use monitor::*;
pub use registry::*;
pub use report::*;
pub use validate::*;
