//! Speaking-rate statistics
//!
//! A rolling window over the phoneme sequence, recomputed on a fixed cadence
//! of audio time. Used only to hint emotion intensity and to scale
//! interpolation speed.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use visage_core::{AudioTime, PhonemeSequence, VisageError, VisageResult};
use visage_viseme::table;

/// Rate tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Length of the rolling window
    pub window: Duration,
    /// Recompute cadence (audio time)
    pub recompute_interval: Duration,
    /// Shortest span a rate is computed over, so early speech is not inflated
    pub min_span: Duration,
    /// Rate (phonemes/s) mapped to the lowest intensity hint
    pub slow_rate: f32,
    /// Rate (phonemes/s) mapped to the highest intensity hint
    pub fast_rate: f32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(2),
            recompute_interval: Duration::from_millis(500),
            min_span: Duration::from_millis(250),
            slow_rate: 3.0,
            fast_rate: 9.0,
        }
    }
}

impl RateConfig {
    pub fn validate(&self) -> VisageResult<()> {
        if self.window.is_zero() || self.recompute_interval.is_zero() {
            return Err(VisageError::InvalidConfig(
                "rate window and interval must be non-zero".into(),
            ));
        }
        if self.min_span.is_zero() || self.min_span > self.window {
            return Err(VisageError::InvalidConfig(
                "min_span must be non-zero and no longer than the window".into(),
            ));
        }
        if !(self.slow_rate >= 0.0 && self.fast_rate > self.slow_rate) {
            return Err(VisageError::InvalidConfig(
                "fast_rate must exceed slow_rate".into(),
            ));
        }
        Ok(())
    }
}

/// Snapshot of the rolling window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeakingRateStats {
    /// Speech phonemes per second
    pub phonemes_per_second: f32,
    /// Mean duration of speech phonemes in the window (seconds)
    pub mean_duration: f32,
    /// Speech phonemes counted
    pub phoneme_count: usize,
    /// When these stats were computed
    pub computed_at: AudioTime,
}

/// Rolling speaking-rate tracker
#[derive(Debug, Clone, Default)]
pub struct SpeakingRateTracker {
    config: RateConfig,
    stats: Option<SpeakingRateStats>,
}

impl SpeakingRateTracker {
    pub fn new(config: RateConfig) -> Self {
        Self {
            config,
            stats: None,
        }
    }

    pub fn config(&self) -> &RateConfig {
        &self.config
    }

    /// Latest stats, if any were computed yet
    pub fn stats(&self) -> Option<&SpeakingRateStats> {
        self.stats.as_ref()
    }

    /// Forget everything (new utterance)
    pub fn reset(&mut self) {
        self.stats = None;
    }

    /// Recompute when the cadence is due; cheap otherwise
    pub fn update(&mut self, t: AudioTime, sequence: &PhonemeSequence) -> Option<&SpeakingRateStats> {
        let due = match &self.stats {
            None => true,
            // Clock went backwards: a new utterance started
            Some(stats) if t < stats.computed_at => true,
            Some(stats) => t - stats.computed_at >= self.config.recompute_interval,
        };

        if due && !sequence.is_empty() {
            self.stats = Some(self.compute(t, sequence));
        }
        self.stats.as_ref()
    }

    fn compute(&self, t: AudioTime, sequence: &PhonemeSequence) -> SpeakingRateStats {
        let window_start = t.saturating_sub(self.config.window);

        let mut count = 0usize;
        let mut total_duration = 0.0f64;
        let mut first_start = None;

        // Inclusive of events starting exactly at t
        let window_end = t.saturating_add(Duration::from_micros(1));

        for event in sequence.starting_between(window_start, window_end) {
            if table::is_silence_label(&event.label) {
                continue;
            }
            if first_start.is_none() {
                first_start = Some(event.start);
            }
            count += 1;
            total_duration += event.duration_secs();
        }

        let span_start = first_start.unwrap_or(window_start).max(window_start);
        // max/min rather than clamp: an unvalidated config may invert the bounds
        let span = t
            .secs_since(span_start)
            .max(self.config.min_span.as_secs_f64())
            .min(self.config.window.as_secs_f64());
        if span <= 0.0 {
            return SpeakingRateStats {
                phonemes_per_second: 0.0,
                mean_duration: 0.0,
                phoneme_count: 0,
                computed_at: t,
            };
        }

        SpeakingRateStats {
            phonemes_per_second: (count as f64 / span) as f32,
            mean_duration: if count > 0 {
                (total_duration / count as f64) as f32
            } else {
                0.0
            },
            phoneme_count: count,
            computed_at: t,
        }
    }

    /// Emotion intensity suggested by how fast the speaker talks
    ///
    /// Maps `slow_rate..fast_rate` linearly onto `0.2..1.0`.
    pub fn emotion_intensity_hint(&self) -> Option<f32> {
        let stats = self.stats.as_ref()?;
        let span = self.config.fast_rate - self.config.slow_rate;
        let norm = ((stats.phonemes_per_second - self.config.slow_rate) / span).clamp(0.0, 1.0);
        Some(0.2 + 0.8 * norm)
    }
}
