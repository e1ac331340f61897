//! Emotion/Prosody Modulator
//!
//! Scales a coarticulated vector by how the speaker feels and how they are
//! stressing the current syllable. Runs after coarticulation, always.
//!
//! Output is limited with a soft knee rather than a hard clamp: below the knee
//! values pass through unchanged, above it they approach 1.0 asymptotically.
//! A stronger emotion therefore always reads as a stronger shape, and no
//! channel ever exceeds 1.0.

use serde::{Deserialize, Serialize};
use visage_core::{
    unit, CanonicalVector, Emotion, EmotionState, ProsodyHint, RawVector, VisageError,
    VisageResult, VisemeCategory,
};

/// Modulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulatorConfig {
    /// Start of the soft limiting region
    pub knee: f32,
    /// Extra gain on all speech categories when excited
    pub excited_boost: f32,
    /// Extra gain on harsh consonants (velar, postalveolar) when angry
    pub angry_consonant_boost: f32,
    /// Extra gain on rounded vowels when sad
    pub sad_rounded_boost: f32,
    /// Vowel gain per unit of pitch deviation
    pub pitch_vowel_gain: f32,
    /// Gain on speech categories at full stress
    pub stress_boost: f32,
    /// How much of the prosodic adjustment is blended in [0.0 - 1.0]
    pub prosody_blend: f32,
}

impl Default for ModulatorConfig {
    fn default() -> Self {
        Self {
            knee: 0.85,
            excited_boost: 0.3,
            angry_consonant_boost: 0.25,
            sad_rounded_boost: 0.2,
            pitch_vowel_gain: 0.5,
            stress_boost: 0.25,
            prosody_blend: 0.8,
        }
    }
}

impl ModulatorConfig {
    pub fn validate(&self) -> VisageResult<()> {
        if !(self.knee > 0.0 && self.knee < 1.0) {
            return Err(VisageError::InvalidConfig("knee must lie in (0, 1)".into()));
        }
        if !(0.0..=1.0).contains(&self.prosody_blend) {
            return Err(VisageError::InvalidConfig(
                "prosody_blend must lie in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Emotion and prosody modulator
#[derive(Debug, Clone, Default)]
pub struct Modulator {
    config: ModulatorConfig,
}

impl Modulator {
    pub fn new(config: ModulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModulatorConfig {
        &self.config
    }

    /// Scale a vector by the current emotion
    pub fn apply_emotion(&self, vector: &CanonicalVector, state: &EmotionState) -> CanonicalVector {
        vector
            .map_raw(|c, w| w * self.emotion_gain(c, state))
            .limit(|x| self.soft_limit(x))
    }

    /// Scale a vector by prosodic emphasis alone
    pub fn apply_prosody(&self, vector: &CanonicalVector, hint: &ProsodyHint) -> CanonicalVector {
        vector
            .map_raw(|c, w| self.blend_prosody(c, w, hint))
            .limit(|x| self.soft_limit(x))
    }

    /// Emotion then prosody, limited once
    pub fn modulate(
        &self,
        vector: &CanonicalVector,
        state: &EmotionState,
        prosody: Option<&ProsodyHint>,
    ) -> CanonicalVector {
        vector
            .map_raw(|c, w| {
                let emotional = w * self.emotion_gain(c, state);
                match prosody {
                    Some(hint) => self.blend_prosody(c, emotional, hint),
                    None => emotional,
                }
            })
            .limit(|x| self.soft_limit(x))
    }

    fn emotion_gain(&self, category: VisemeCategory, state: &EmotionState) -> f32 {
        let i = state.intensity;
        let mut gain = state.effective_multiplier();

        match state.emotion {
            Emotion::Excited if !category.is_silence() => {
                gain *= 1.0 + self.config.excited_boost * i;
            }
            Emotion::Angry if matches!(category, VisemeCategory::KK | VisemeCategory::CH) => {
                gain *= 1.0 + self.config.angry_consonant_boost * i;
            }
            Emotion::Sad if category.is_rounded() => {
                gain *= 1.0 + self.config.sad_rounded_boost * i;
            }
            _ => {}
        }

        gain
    }

    /// Prosodic gain on top of `value`, blended in by `prosody_blend`
    fn blend_prosody(&self, category: VisemeCategory, value: f32, hint: &ProsodyHint) -> f32 {
        if category.is_silence() {
            return value;
        }

        let mut gain = 1.0 + self.config.stress_boost * hint.stress;
        if category.is_vowel() {
            gain *= 1.0 + self.config.pitch_vowel_gain * (hint.pitch_scale - 1.0);
        }

        let target = value * gain.max(0.0);
        value + (target - value) * self.config.prosody_blend
    }

    /// Identity below the knee, asymptotic to 1.0 above it
    pub fn soft_limit(&self, x: f32) -> f32 {
        let knee = self.config.knee;
        if x.is_nan() || x <= 0.0 {
            0.0
        } else if x <= knee {
            x
        } else {
            let headroom = 1.0 - knee;
            unit(knee + headroom * ((x - knee) / headroom).tanh())
        }
    }
}
