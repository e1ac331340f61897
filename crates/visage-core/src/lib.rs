//! VISAGE Core - Fundamental types for phoneme-driven facial animation
//!
//! This crate defines the types shared by every stage of the engine:
//! - Playback time (AudioTime) and the audio clock seam
//! - Phoneme events and validated sequences
//! - The rig-independent canonical viseme vector
//! - Emotion and prosody state
//! - Errors and the fault link shared with the health layer

pub mod emotion;
pub mod error;
pub mod fault;
pub mod phoneme;
pub mod time;
pub mod viseme;

pub use emotion::*;
pub use error::*;
pub use fault::*;
pub use phoneme::*;
pub use time::*;
pub use viseme::*;
