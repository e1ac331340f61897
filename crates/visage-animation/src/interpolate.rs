//! Temporal Interpolator - eases rendered channels toward their targets
//!
//! Each channel follows an ease-in-out cubic path from where it was when the
//! target last changed significantly to the current target. Speed is higher
//! right after a change, so new visemes land promptly, and lower while
//! holding, so a steady shape does not jitter. Speaking rate scales both.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use visage_core::{unit, AudioTime, VisageError, VisageResult};
use visage_rig::{ChannelWeights, RigDescriptor};

use crate::rate::SpeakingRateStats;

/// Interpolator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolatorConfig {
    /// Progress per second while a new target settles
    pub responsive_speed: f32,
    /// Progress per second while holding
    pub steady_speed: f32,
    /// How long a change counts as new
    pub settle_window: Duration,
    /// Per-channel target change that restarts the ease
    pub change_epsilon: f32,
    /// Speaking rate (phonemes/s) at which speed is unscaled
    pub nominal_rate: f32,
    pub min_rate_multiplier: f32,
    pub max_rate_multiplier: f32,
    /// Amplitude of the liveliness wobble on the dominant channel
    pub perturbation_amplitude: f32,
    /// Wobble frequency in Hz of audio time
    pub perturbation_hz: f32,
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            responsive_speed: 12.0,
            steady_speed: 6.0,
            settle_window: Duration::from_millis(150),
            change_epsilon: 0.01,
            nominal_rate: 6.0,
            min_rate_multiplier: 0.5,
            max_rate_multiplier: 2.0,
            perturbation_amplitude: 0.02,
            perturbation_hz: 3.1,
        }
    }
}

impl InterpolatorConfig {
    pub fn validate(&self) -> VisageResult<()> {
        if !(self.responsive_speed > 0.0 && self.steady_speed > 0.0) {
            return Err(VisageError::InvalidConfig(
                "interpolation speeds must be positive".into(),
            ));
        }
        if !(self.nominal_rate > 0.0
            && self.min_rate_multiplier > 0.0
            && self.max_rate_multiplier >= self.min_rate_multiplier)
        {
            return Err(VisageError::InvalidConfig(
                "rate multiplier bounds are inconsistent".into(),
            ));
        }
        if !(0.0..=0.1).contains(&self.perturbation_amplitude) {
            return Err(VisageError::InvalidConfig(
                "perturbation_amplitude must lie in [0, 0.1]".into(),
            ));
        }
        Ok(())
    }
}

/// Ease-in-out cubic on [0, 1]
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

/// One channel's position along its eased path
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    /// Where the path started
    pub origin: f32,
    pub current: f32,
    pub target: f32,
    /// Position along the path [0.0 - 1.0]
    pub progress: f32,
}

/// Per-channel animation state for one loaded rig
#[derive(Debug, Clone)]
pub struct FrameState {
    layout: Arc<RigDescriptor>,
    channels: Vec<ChannelState>,
    /// Time since the last significant target change
    since_change: Duration,
}

impl FrameState {
    /// All channels resting at zero
    pub fn new(layout: Arc<RigDescriptor>) -> Self {
        let channels = vec![
            ChannelState {
                progress: 1.0,
                ..ChannelState::default()
            };
            layout.slot_count()
        ];
        Self {
            layout,
            channels,
            since_change: Duration::MAX,
        }
    }

    pub fn layout(&self) -> &Arc<RigDescriptor> {
        &self.layout
    }

    pub fn channels(&self) -> &[ChannelState] {
        &self.channels
    }

    /// Does this state belong to `weights`' rig?
    pub fn matches(&self, weights: &ChannelWeights) -> bool {
        Arc::ptr_eq(&self.layout, weights.layout())
    }

    /// Current values as weights
    pub fn current(&self) -> ChannelWeights {
        let mut out = ChannelWeights::neutral(self.layout.clone());
        self.current_into(&mut out);
        out
    }

    pub fn current_into(&self, out: &mut ChannelWeights) {
        for (i, ch) in self.channels.iter().enumerate() {
            out.set_slot(i, ch.current);
        }
    }

    /// Target values as weights
    pub fn target(&self) -> ChannelWeights {
        let mut out = ChannelWeights::neutral(self.layout.clone());
        for (i, ch) in self.channels.iter().enumerate() {
            out.set_slot(i, ch.target);
        }
        out
    }

    /// Every channel has reached its target
    pub fn is_settled(&self) -> bool {
        self.channels.iter().all(|ch| ch.progress >= 1.0)
    }

    pub fn since_change(&self) -> Duration {
        self.since_change
    }
}

/// Temporal interpolator
#[derive(Debug, Clone, Default)]
pub struct Interpolator {
    config: InterpolatorConfig,
}

impl Interpolator {
    pub fn new(config: InterpolatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InterpolatorConfig {
        &self.config
    }

    /// `clamp(rate / nominal, min, max)`, or 1.0 before any rate is known
    pub fn rate_multiplier(&self, stats: Option<&SpeakingRateStats>) -> f32 {
        match stats {
            Some(stats) if stats.phonemes_per_second.is_finite() => (stats.phonemes_per_second
                / self.config.nominal_rate)
                .max(self.config.min_rate_multiplier)
                .min(self.config.max_rate_multiplier),
            _ => 1.0,
        }
    }

    /// Progress per second for the next step
    pub fn speed(&self, state: &FrameState, stats: Option<&SpeakingRateStats>) -> f32 {
        let base = if state.since_change < self.config.settle_window {
            self.config.responsive_speed
        } else {
            self.config.steady_speed
        };
        base * self.rate_multiplier(stats)
    }

    /// Advance one tick toward `target`
    ///
    /// A state laid out for a different rig is rebuilt from rest first.
    pub fn step(
        &self,
        state: &mut FrameState,
        target: &ChannelWeights,
        dt: Duration,
        stats: Option<&SpeakingRateStats>,
    ) {
        if !state.matches(target) {
            *state = FrameState::new(target.layout().clone());
        }

        let significant = state
            .channels
            .iter()
            .enumerate()
            .any(|(i, ch)| (target.slot(i) - ch.target).abs() > self.config.change_epsilon);

        if significant {
            for (i, ch) in state.channels.iter_mut().enumerate() {
                ch.origin = ch.current;
                ch.target = target.slot(i);
                ch.progress = 0.0;
            }
            state.since_change = Duration::ZERO;
        } else {
            // Small drift follows the path without restarting it
            for (i, ch) in state.channels.iter_mut().enumerate() {
                ch.target = target.slot(i);
            }
        }

        let delta = self.speed(state, stats) * dt.as_secs_f32();
        for ch in &mut state.channels {
            ch.progress = (ch.progress + delta).min(1.0);
            if ch.progress >= 1.0 {
                ch.current = ch.target;
                ch.origin = ch.target;
            } else {
                let eased = ease_in_out_cubic(ch.progress);
                ch.current = unit(ch.origin + (ch.target - ch.origin) * eased);
            }
        }

        if !significant {
            state.since_change = state.since_change.saturating_add(dt);
        }
    }

    /// Write rendered values: current plus the wobble on the dominant channel
    pub fn render_into(
        &self,
        state: &FrameState,
        t: AudioTime,
        speaking: bool,
        out: &mut ChannelWeights,
    ) {
        state.current_into(out);
        if !speaking || self.config.perturbation_amplitude <= 0.0 {
            return;
        }

        let dominant = state
            .channels
            .iter()
            .enumerate()
            .filter(|(_, ch)| ch.current > self.config.perturbation_amplitude)
            .fold(None, |best: Option<(usize, f32)>, (i, ch)| match best {
                Some((_, v)) if v >= ch.current => best,
                _ => Some((i, ch.current)),
            });

        if let Some((slot, value)) = dominant {
            out.set_slot(slot, value + self.perturbation(t));
        }
    }

    /// Wobble at `t`; independent of phoneme timing
    pub fn perturbation(&self, t: AudioTime) -> f32 {
        let phase = TAU * self.config.perturbation_hz * (t.as_secs_f64() % 1000.0) as f32;
        self.config.perturbation_amplitude * phase.sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visage_rig::RigDescriptor;

    const FRAME: Duration = Duration::from_micros(16_667);

    fn layout() -> Arc<RigDescriptor> {
        Arc::new(RigDescriptor::from_channels("t", &["a", "b", "c"]))
    }

    fn weights(layout: &Arc<RigDescriptor>, values: &[f32]) -> ChannelWeights {
        let mut w = ChannelWeights::neutral(layout.clone());
        for (i, v) in values.iter().enumerate() {
            w.set_slot(i, *v);
        }
        w
    }

    fn stats(rate: f32) -> SpeakingRateStats {
        SpeakingRateStats {
            phonemes_per_second: rate,
            mean_duration: 0.1,
            phoneme_count: 10,
            computed_at: AudioTime::ZERO,
        }
    }

    #[test]
    fn test_ease_curve() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        // Slow start, slow finish
        assert!(ease_in_out_cubic(0.1) < 0.1);
        assert!(ease_in_out_cubic(0.9) > 0.9);
    }

    #[test]
    fn test_rate_multiplier_bounds() {
        let interp = Interpolator::default();
        assert_eq!(interp.rate_multiplier(None), 1.0);
        assert_eq!(interp.rate_multiplier(Some(&stats(6.0))), 1.0);
        assert_eq!(interp.rate_multiplier(Some(&stats(30.0))), 2.0);
        assert_eq!(interp.rate_multiplier(Some(&stats(0.5))), 0.5);
    }

    #[test]
    fn test_reaches_target() {
        let interp = Interpolator::default();
        let layout = layout();
        let mut state = FrameState::new(layout.clone());
        let target = weights(&layout, &[1.0, 0.5, 0.0]);

        for _ in 0..30 {
            interp.step(&mut state, &target, FRAME, None);
        }
        assert!(state.is_settled());
        assert_eq!(state.current(), target);
    }

    #[test]
    fn test_responsive_then_steady() {
        let interp = Interpolator::default();
        let layout = layout();
        let mut state = FrameState::new(layout.clone());
        let target = weights(&layout, &[1.0, 0.0, 0.0]);

        interp.step(&mut state, &target, FRAME, None);
        assert_eq!(interp.speed(&state, None), 12.0);

        for _ in 0..12 {
            interp.step(&mut state, &target, FRAME, None);
        }
        assert_eq!(interp.speed(&state, None), 6.0);
    }

    #[test]
    fn test_continuity() {
        let interp = Interpolator::default();
        let layout = layout();
        let mut state = FrameState::new(layout.clone());
        let targets = [
            weights(&layout, &[1.0, 0.0, 0.0]),
            weights(&layout, &[0.0, 1.0, 0.0]),
            weights(&layout, &[0.0, 0.0, 1.0]),
        ];

        let mut previous = state.current();
        for tick in 0..120 {
            interp.step(&mut state, &targets[(tick / 7) % 3], FRAME, None);
            let current = state.current();
            // 0.2 progress per tick; the steepest eased chord is ~0.49
            assert!(current.max_abs_diff(&previous) <= 0.5);
            previous = current;
        }
    }

    #[test]
    fn test_small_drift_does_not_restart() {
        let interp = Interpolator::default();
        let layout = layout();
        let mut state = FrameState::new(layout.clone());

        interp.step(&mut state, &weights(&layout, &[0.8, 0.0, 0.0]), FRAME, None);
        let progress = state.channels()[0].progress;
        interp.step(&mut state, &weights(&layout, &[0.805, 0.0, 0.0]), FRAME, None);

        assert!(state.channels()[0].progress > progress);
        assert_eq!(state.channels()[0].target, 0.805);
    }

    #[test]
    fn test_faster_speech_is_snappier() {
        let interp = Interpolator::default();
        let layout = layout();
        let target = weights(&layout, &[1.0, 0.0, 0.0]);

        let mut slow = FrameState::new(layout.clone());
        let mut fast = FrameState::new(layout.clone());
        for _ in 0..3 {
            interp.step(&mut slow, &target, FRAME, Some(&stats(3.0)));
            interp.step(&mut fast, &target, FRAME, Some(&stats(12.0)));
        }
        assert!(fast.channels()[0].current > slow.channels()[0].current);
    }

    #[test]
    fn test_layout_change_rebuilds_state() {
        let interp = Interpolator::default();
        let mut state = FrameState::new(layout());
        let other = Arc::new(RigDescriptor::from_channels("u", &["x"]));

        interp.step(&mut state, &weights(&other, &[1.0]), FRAME, None);
        assert_eq!(state.channels().len(), 1);
        assert!(Arc::ptr_eq(state.layout(), &other));
    }

    #[test]
    fn test_perturbation_only_on_dominant_while_speaking() {
        let interp = Interpolator::default();
        let layout = layout();
        let mut state = FrameState::new(layout.clone());
        let target = weights(&layout, &[0.6, 0.3, 0.0]);
        for _ in 0..30 {
            interp.step(&mut state, &target, FRAME, None);
        }

        // Quarter period of 3.1 Hz: wobble at its peak
        let t = AudioTime::from_secs_f64(0.25 / 3.1);
        let mut out = ChannelWeights::neutral(layout.clone());

        interp.render_into(&state, t, true, &mut out);
        assert!((out.slot(0) - 0.62).abs() < 1e-3);
        assert_eq!(out.slot(1), 0.3);
        assert_eq!(out.slot(2), 0.0);

        interp.render_into(&state, t, false, &mut out);
        assert_eq!(out, target);
    }
}
