//! Emotion and prosody state
//!
//! Set by an external classifier or UI. The engine treats the latest value
//! as authoritative and never mutates it.

use serde::{Deserialize, Serialize};

/// Discrete emotional colouring of speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    #[default]
    Neutral,
    Excited,
    Calm,
    Angry,
    Sad,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Neutral,
        Emotion::Excited,
        Emotion::Calm,
        Emotion::Angry,
        Emotion::Sad,
    ];

    /// Base articulation multiplier at full intensity
    pub fn base_multiplier(self) -> f32 {
        match self {
            Emotion::Neutral => 1.0,
            Emotion::Excited => 1.3,
            Emotion::Calm => 0.8,
            Emotion::Angry => 1.4,
            Emotion::Sad => 0.7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Excited => "excited",
            Emotion::Calm => "calm",
            Emotion::Angry => "angry",
            Emotion::Sad => "sad",
        }
    }

    /// Parse a label from a sentiment collaborator
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Current emotion with its strength
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionState {
    pub emotion: Emotion,
    /// Strength [0.0 - 1.0]
    pub intensity: f32,
}

impl EmotionState {
    pub fn new(emotion: Emotion, intensity: f32) -> Self {
        let intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(0.0, 1.0)
        };
        Self { emotion, intensity }
    }

    pub fn neutral() -> Self {
        Self::new(Emotion::Neutral, 1.0)
    }

    /// Multiplier interpolated between 1.0 and the emotion's base by intensity
    pub fn effective_multiplier(&self) -> f32 {
        1.0 + (self.emotion.base_multiplier() - 1.0) * self.intensity
    }
}

impl Default for EmotionState {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Optional prosodic emphasis for the current stretch of speech
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProsodyHint {
    /// Relative pitch (1.0 = speaker baseline)
    pub pitch_scale: f32,
    /// Lexical stress [0.0 - 1.0]
    pub stress: f32,
}

impl ProsodyHint {
    pub fn new(pitch_scale: f32, stress: f32) -> Self {
        Self {
            pitch_scale: if pitch_scale.is_finite() {
                pitch_scale.clamp(0.5, 1.5)
            } else {
                1.0
            },
            stress: if stress.is_finite() {
                stress.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    pub fn flat() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl Default for ProsodyHint {
    fn default() -> Self {
        Self::flat()
    }
}
