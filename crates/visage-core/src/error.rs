//! Error types for VISAGE

use thiserror::Error;

/// Core VISAGE errors
///
/// None of these reach the render loop: the per-frame path converts every
/// failure into neutral or fallback output and only counts it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisageError {
    // Input errors
    #[error("Malformed phoneme sequence at event {index}: {reason}")]
    MalformedSequence { index: usize, reason: String },

    // Collaborator errors
    #[error("Audio clock unavailable: {0}")]
    ClockUnavailable(String),

    #[error("Channel {channel} maps to index {index}, mesh has {len} intensities")]
    ChannelIndexOutOfRange {
        channel: String,
        index: usize,
        len: usize,
    },

    // Numeric errors
    #[error("Non-finite or out-of-range value in {stage} for {channel}")]
    NumericFault { stage: &'static str, channel: String },

    // Health errors
    #[error("Circuit open: serving neutral output")]
    CircuitOpen,

    // Config errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for VISAGE operations
pub type VisageResult<T> = Result<T, VisageError>;
