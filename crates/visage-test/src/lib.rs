//! VISAGE Test Harness - Pipeline validation under adverse input
//!
//! This crate provides:
//! - A scripted playback clock with drift, jitter and drop-outs
//! - A seeded phoneme sequence fuzzer (well-formed and malformed)
//! - A render harness that drives an animator and checks every frame

pub mod clock_sim;
pub mod render_harness;
pub mod sequence_fuzzer;

pub use clock_sim::*;
pub use render_harness::*;
pub use sequence_fuzzer::*;
