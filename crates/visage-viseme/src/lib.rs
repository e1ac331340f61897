//! VISAGE Viseme Stage - From phonemes to a rig-independent mouth shape
//!
//! Speech is a SEQUENCE OF SHAPES, not a sequence of sounds.
//!
//! # Pipeline
//!
//! 1. Table: phoneme label → canonical vector (static design constants)
//! 2. Scheduler: blend the active shape with its neighbours
//!    (anticipation of the next sound, carry-over of the previous one)
//! 3. Modulator: scale by emotion, then by prosody, then limit to [0, 1]
//!
//! The order is fixed: coarticulation first, modulation second.

pub mod modulate;
pub mod schedule;
pub mod table;

pub use modulate::*;
pub use schedule::*;
pub use table::*;
