//! Silence/Idle Handler
//!
//! A mouth that snaps to zero the moment speech stops looks dead. During
//! silence the handler supplies a slow breathing motion instead, and tracks
//! how long the silence has lasted so the animator knows when to relax the
//! rest of the face.

use std::f32::consts::TAU;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use visage_core::{AudioTime, PhonemeSequence, VisageError, VisageResult};
use visage_viseme::table;

/// Largest breathing amplitude accepted by validation
pub const MAX_BREATHING_AMPLITUDE: f32 = 0.03;

/// Silence handler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceConfig {
    /// Gap length after which non-breathing channels relax to neutral
    pub neutralize_after: Duration,
    /// Peak breathing amplitude
    pub breathing_amplitude: f32,
    /// Breathing frequency in Hz
    pub breathing_hz: f32,
}

impl Default for SilenceConfig {
    fn default() -> Self {
        Self {
            neutralize_after: Duration::from_millis(100),
            breathing_amplitude: 0.025,
            breathing_hz: 0.25,
        }
    }
}

impl SilenceConfig {
    pub fn validate(&self) -> VisageResult<()> {
        if !(0.0..=MAX_BREATHING_AMPLITUDE).contains(&self.breathing_amplitude) {
            return Err(VisageError::InvalidConfig(format!(
                "breathing_amplitude must lie in [0, {MAX_BREATHING_AMPLITUDE}]"
            )));
        }
        if !(self.breathing_hz > 0.0 && self.breathing_hz.is_finite()) {
            return Err(VisageError::InvalidConfig(
                "breathing_hz must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Why the mouth is silent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilenceKind {
    /// No event is sounding (empty sequence, between or after events)
    Gap,
    /// A silence phoneme is sounding (sil, sp, pau)
    Pause,
}

/// Result of one silence check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilenceState {
    pub is_silent: bool,
    pub kind: Option<SilenceKind>,
    /// Breathing amplitude to add to the mouth (0 while speaking)
    pub mouth_open: f32,
    /// How long the current silence has lasted
    pub silent_for: Duration,
    /// A gap has lasted long enough to relax the face
    pub neutralize: bool,
}

impl SilenceState {
    pub fn speaking() -> Self {
        Self {
            is_silent: false,
            kind: None,
            mouth_open: 0.0,
            silent_for: Duration::ZERO,
            neutralize: false,
        }
    }
}

/// Silence/idle handler
#[derive(Debug, Clone, Default)]
pub struct SilenceHandler {
    config: SilenceConfig,
    silent_for: Duration,
}

impl SilenceHandler {
    pub fn new(config: SilenceConfig) -> Self {
        Self {
            config,
            silent_for: Duration::ZERO,
        }
    }

    pub fn config(&self) -> &SilenceConfig {
        &self.config
    }

    /// Classify `t` and advance the silence timer by `dt`
    pub fn handle_silence(
        &mut self,
        t: AudioTime,
        sequence: &PhonemeSequence,
        dt: Duration,
    ) -> SilenceState {
        let Some(kind) = Self::classify(t, sequence) else {
            self.silent_for = Duration::ZERO;
            return SilenceState::speaking();
        };

        self.silent_for = self.silent_for.saturating_add(dt);

        SilenceState {
            is_silent: true,
            kind: Some(kind),
            mouth_open: self.breathing(t),
            silent_for: self.silent_for,
            neutralize: kind == SilenceKind::Gap && self.silent_for >= self.config.neutralize_after,
        }
    }

    /// Silence kind at `t`, or None while a speech sound is active
    pub fn classify(t: AudioTime, sequence: &PhonemeSequence) -> Option<SilenceKind> {
        match sequence.active_index(t).and_then(|i| sequence.get(i)) {
            None => Some(SilenceKind::Gap),
            Some(event) if table::is_silence_label(&event.label) => Some(SilenceKind::Pause),
            Some(_) => None,
        }
    }

    /// Breathing amplitude at `t`, within `[0, breathing_amplitude]`
    pub fn breathing(&self, t: AudioTime) -> f32 {
        let phase = TAU * self.config.breathing_hz * t.as_secs_f64() as f32;
        self.config.breathing_amplitude * (0.5 + 0.5 * phase.sin())
    }

    pub fn silent_for(&self) -> Duration {
        self.silent_for
    }

    pub fn reset(&mut self) {
        self.silent_for = Duration::ZERO;
    }
}
