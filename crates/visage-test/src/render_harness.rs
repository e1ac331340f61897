//! Render Harness - drives an animator frame by frame and checks output
//!
//! Checks every frame for bounds and continuity, and the tail of the run
//! for convergence to the idle pose.

use std::time::Duration;

use visage_animation::AvatarAnimator;
use visage_core::AudioTime;
use visage_rig::ChannelWeights;

use crate::clock_sim::ScriptedClock;

/// Harness configuration
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Render interval
    pub frame: Duration,
    /// Largest per-channel change between consecutive frames
    pub max_step: f32,
    /// Largest channel value once the face has gone idle
    pub idle_limit: f32,
    /// Time after the last event by which the face must be idle
    pub settle_time: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            frame: Duration::from_micros(16_667),
            // Steepest eased chord at the fastest rate, plus wobble
            max_step: 0.85,
            idle_limit: 0.03,
            settle_time: Duration::from_millis(600),
        }
    }
}

/// A failed frame check
#[derive(Clone, Debug, PartialEq)]
pub enum Violation {
    NoOutput { frame: u64 },
    OutOfBounds { frame: u64, channel: String, value: f32 },
    Discontinuity { frame: u64, step: f32 },
    NotIdle { at: AudioTime, channel: String, value: f32 },
}

/// Result of one harness run
#[derive(Clone, Debug, Default)]
pub struct RenderReport {
    pub frames: u64,
    /// Frames rendered while the clock was unavailable
    pub clock_lost_frames: u64,
    pub max_step: f32,
    pub max_value: f32,
    pub violations: Vec<Violation>,
    pub last: Option<ChannelWeights>,
}

impl RenderReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Frame-by-frame driver
pub struct RenderHarness {
    config: HarnessConfig,
}

impl RenderHarness {
    pub fn new(config: HarnessConfig) -> Self {
        RenderHarness { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Render until the clock passes `until`
    ///
    /// Frames after `idle_from` (if given) must be idle.
    pub fn run(
        &self,
        animator: &mut AvatarAnimator,
        clock: &mut ScriptedClock,
        until: AudioTime,
        idle_from: Option<AudioTime>,
    ) -> RenderReport {
        let mut report = RenderReport::default();
        let mut previous: Option<ChannelWeights> = None;

        while clock.position() < until {
            clock.advance(self.config.frame);
            report.frames += 1;
            if !clock.is_available() {
                report.clock_lost_frames += 1;
            }

            let Some(out) = animator.tick(&*clock, self.config.frame).cloned() else {
                report.violations.push(Violation::NoOutput {
                    frame: report.frames,
                });
                continue;
            };

            for (channel, value) in out.iter() {
                if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                    report.violations.push(Violation::OutOfBounds {
                        frame: report.frames,
                        channel: channel.to_string(),
                        value,
                    });
                }
                report.max_value = report.max_value.max(value);
            }

            if let Some(prev) = &previous {
                let step = out.max_abs_diff(prev);
                report.max_step = report.max_step.max(step);
                if step > self.config.max_step {
                    report.violations.push(Violation::Discontinuity {
                        frame: report.frames,
                        step,
                    });
                }
            }

            if idle_from.map_or(false, |t| clock.position() >= t) {
                if let Some((channel, value)) = out.iter().find(|&(_, v)| v > self.config.idle_limit) {
                    report.violations.push(Violation::NotIdle {
                        at: clock.position(),
                        channel: channel.to_string(),
                        value,
                    });
                }
            }

            previous = Some(out);
        }

        report.last = previous;
        report
    }

    /// Render a loaded sequence to its end plus the settle time; the
    /// final frames must be idle
    pub fn run_utterance(
        &self,
        animator: &mut AvatarAnimator,
        clock: &mut ScriptedClock,
    ) -> RenderReport {
        let end = animator.sequence().end_time();
        let idle_from = end.saturating_add(self.config.settle_time);
        let until = idle_from.saturating_add(Duration::from_millis(200));
        self.run(animator, clock, until, Some(idle_from))
    }
}

impl Default for RenderHarness {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use visage_animation::AnimatorConfig;
    use visage_core::PhonemeEvent;
    use visage_rig::RigDescriptor;

    fn animator() -> AvatarAnimator {
        let mut animator = AvatarAnimator::new(AnimatorConfig::default());
        animator.load_rig(Arc::new(RigDescriptor::from_channels(
            "generic",
            &["MouthOpen", "MouthClose"],
        )));
        animator.set_sequence(vec![
            PhonemeEvent::new("P", 0.0, 0.1),
            PhonemeEvent::new("AA", 0.1, 0.4),
            PhonemeEvent::new("sil", 0.4, 0.6),
        ]);
        animator
    }

    #[test]
    fn test_clean_utterance() {
        let mut animator = animator();
        let report = RenderHarness::default().run_utterance(&mut animator, &mut ScriptedClock::new(1));

        assert!(report.is_clean(), "{:?}", report.violations);
        assert!(report.frames > 60);
        assert!(report.max_value > 0.7);
        assert_eq!(report.clock_lost_frames, 0);
    }

    #[test]
    fn test_no_rig_reported() {
        let mut animator = AvatarAnimator::new(AnimatorConfig::default());
        let report = RenderHarness::default().run(
            &mut animator,
            &mut ScriptedClock::new(1),
            AudioTime::from_millis(50),
            None,
        );
        assert!(matches!(report.violations[0], Violation::NoOutput { frame: 1 }));
    }

    #[test]
    fn test_strict_step_flags_discontinuity() {
        let harness = RenderHarness::new(HarnessConfig {
            max_step: 0.001,
            ..HarnessConfig::default()
        });
        let report = harness.run(
            &mut animator(),
            &mut ScriptedClock::new(1),
            AudioTime::from_millis(300),
            None,
        );
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, Violation::Discontinuity { .. })));
    }
}
