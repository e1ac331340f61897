//! Coarticulation & Anticipation Scheduler
//!
//! Real mouths never hold one shape per sound. The lips start moving toward
//! the next sound before the current one ends (anticipation) and keep some
//! of the previous shape right after a transition (carry-over).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use visage_core::{AudioTime, CanonicalVector, PhonemeSequence, VisageError, VisageResult};

use crate::table;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Final stretch of an event during which the next shape is anticipated
    pub anticipation_window: Duration,
    /// Maximum pull toward the next shape [0.0 - 1.0]
    pub anticipation_strength: f32,
    /// Leading fraction of an event influenced by the previous shape
    pub carryover_fraction: f32,
    /// Maximum pull toward the previous shape [0.0 - 1.0]
    pub carryover_strength: f32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            anticipation_window: Duration::from_millis(50),
            anticipation_strength: 0.3,
            carryover_fraction: 0.2,
            carryover_strength: 0.4,
        }
    }
}

impl ScheduleConfig {
    /// No blending at all (one shape per phoneme)
    pub fn discrete() -> Self {
        Self {
            anticipation_strength: 0.0,
            carryover_strength: 0.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> VisageResult<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.anticipation_strength) || !unit.contains(&self.carryover_strength)
        {
            return Err(VisageError::InvalidConfig(
                "blend strengths must lie in [0, 1]".into(),
            ));
        }
        if !(self.carryover_fraction > 0.0 && self.carryover_fraction <= 1.0) {
            return Err(VisageError::InvalidConfig(
                "carryover_fraction must lie in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// The shape to show right now
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveViseme {
    /// Index of the sounding event in the sequence
    pub event_index: usize,
    /// Blended canonical vector
    pub vector: CanonicalVector,
    /// Carry-over factor applied (diagnostics only)
    pub blend_factor: f32,
    /// Anticipation factor applied (diagnostics only)
    pub anticipation_factor: f32,
    /// Position within the event [0.0 - 1.0]
    pub progress: f32,
    /// The event is a pause marker (sil, sp, ...)
    pub is_pause: bool,
}

/// Coarticulation scheduler
#[derive(Debug, Clone, Default)]
pub struct CoarticulationScheduler {
    config: ScheduleConfig,
}

impl CoarticulationScheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Blended viseme at `audio_time`, or None when nothing is sounding
    pub fn active_viseme(
        &self,
        audio_time: AudioTime,
        sequence: &PhonemeSequence,
    ) -> Option<ActiveViseme> {
        let index = sequence.active_index(audio_time)?;
        let event = sequence.get(index)?;

        let duration_us = event.end.as_micros() - event.start.as_micros();
        let progress = if duration_us <= 0 {
            1.0
        } else {
            ((audio_time.as_micros() - event.start.as_micros()) as f64 / duration_us as f64)
                .clamp(0.0, 1.0) as f32
        };

        let base = table::lookup(&event.label);
        let mut vector = base;

        // Anticipation: ramp 0 → 1 over the final window
        let mut anticipation_factor = 0.0;
        if let Some(next) = sequence.next(index) {
            let window_us = (self.config.anticipation_window.as_micros() as i64).min(duration_us);
            let remaining_us = event.end.as_micros() - audio_time.as_micros();
            let ramp = if window_us <= 0 {
                1.0
            } else if remaining_us <= window_us {
                1.0 - remaining_us as f32 / window_us as f32
            } else {
                0.0
            };
            if ramp > 0.0 {
                anticipation_factor = ramp.clamp(0.0, 1.0) * self.config.anticipation_strength;
                vector = vector.lerp(&table::lookup(&next.label), anticipation_factor);
            }
        }

        // Carry-over: decays 1 → 0 over the leading fraction
        let mut blend_factor = 0.0;
        if let Some(previous) = sequence.previous(index) {
            if progress < self.config.carryover_fraction {
                let decay = 1.0 - progress / self.config.carryover_fraction;
                blend_factor = decay * self.config.carryover_strength;
                vector = vector.lerp(&table::lookup(&previous.label), blend_factor);
            }
        }

        Some(ActiveViseme {
            event_index: index,
            vector,
            blend_factor,
            anticipation_factor,
            progress,
            is_pause: table::is_silence_label(&event.label),
        })
    }
}
