//! VISAGE Runtime - Wiring for a host application
//!
//! - Config bundle loadable from JSON
//! - Tracing subscriber setup
//! - Background health service on its own cadence
//!
//! The render loop stays with the host: it owns the `AvatarAnimator` and
//! calls `tick` once per frame. This crate only runs what happens beside it.

pub mod config;
pub mod error;
pub mod service;
pub mod telemetry;

pub use config::*;
pub use error::*;
pub use service::*;
pub use telemetry::*;
