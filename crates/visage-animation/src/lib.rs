//! VISAGE Animation - The per-frame path
//!
//! One tick of the animator:
//!
//! ```text
//! audio clock ─┐
//! sequence ────┼─► Scheduler ─► Modulator ─► Rig Adapter ─► Interpolator ─► mesh
//! emotion ─────┘        │
//!                       └─ no active phoneme ─► Silence Handler (breathing)
//! ```
//!
//! Everything here runs synchronously inside the host's render callback.
//! Nothing blocks and nothing returns an error into the render loop: clock
//! loss, malformed input and numeric faults degrade to neutral output and
//! are counted on the shared `FaultLink`.

pub mod animator;
pub mod interpolate;
pub mod rate;
pub mod silence;

pub use animator::*;
pub use interpolate::*;
pub use rate::*;
pub use silence::*;
