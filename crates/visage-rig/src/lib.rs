//! VISAGE Rig Adapter - Canonical shapes onto whatever the avatar exposes
//!
//! Avatars disagree on what a face can do. Some expose one channel per
//! viseme, some expose fine-grained jaw and lip controls, some expose a
//! handful of oddly named sliders, and some expose nothing at all.
//!
//! The rig is classified ONCE when it loads:
//!
//! - Broad-viseme: ≥10 of the 15 canonical channels → 1:1 mapping
//! - Fine-grained: ≥6 of the jaw/mouth vocabulary → weighted table
//! - Generic: any named channel → mouth-openness heuristic
//! - None: no channels → built-in procedural head
//!
//! The per-frame path then runs a fixed strategy with pre-resolved indices.

pub mod adapter;
pub mod descriptor;
pub mod mesh;
pub mod procedural;

pub use adapter::*;
pub use descriptor::*;
pub use mesh::*;
pub use procedural::*;
