//! Validators - synthetic runs of the pipeline
//!
//! Each validator builds its own animators and clocks, so a validation run
//! never touches the live avatar or its fault counters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use visage_animation::{AnimatorConfig, AvatarAnimator};
use visage_core::{
    AudioClock, AudioTime, Emotion, EmotionState, ManualClock, PhonemeEvent, VisageError,
    VisageResult,
};
use visage_rig::{ChannelWeights, RigDescriptor, CROSS_RIG_OPENNESS_TOLERANCE};

use crate::registry::{Behavior, CheckOutcome};

const FRAME: Duration = Duration::from_micros(16_667);

/// Step between sampled instants of a scenario
const SAMPLE_STEP_MS: i64 = 10;

/// Instants of the reference scenario compared across rig classes
const CROSS_RIG_SAMPLES_MS: [i64; 5] = [50, 150, 250, 350, 500];

const BROAD_CHANNELS: [&str; 15] = [
    "viseme_sil", "viseme_PP", "viseme_FF", "viseme_TH", "viseme_DD", "viseme_kk", "viseme_CH",
    "viseme_SS", "viseme_nn", "viseme_RR", "viseme_aa", "viseme_E", "viseme_I", "viseme_O",
    "viseme_U",
];

const FINE_CHANNELS: [&str; 6] = [
    "jawOpen", "jawForward", "mouthClose", "mouthFunnel", "mouthPucker", "mouthStretch_L",
];

/// Latency budget for the performance validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Baseline cost of one tick
    pub budget: Duration,
    /// Allowed overshoot as a fraction of the budget
    pub tolerance: f32,
    /// Ticks timed per sample
    pub iterations: u32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            budget: Duration::from_micros(500),
            tolerance: 0.5,
            iterations: 120,
        }
    }
}

impl PerformanceConfig {
    pub fn validate(&self) -> VisageResult<()> {
        if self.iterations == 0 || self.budget.is_zero() {
            return Err(VisageError::InvalidConfig(
                "performance budget and iterations must be non-zero".into(),
            ));
        }
        if !(self.tolerance >= 0.0 && self.tolerance.is_finite()) {
            return Err(VisageError::InvalidConfig(
                "performance tolerance must be non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Largest accepted mean tick latency
    pub fn limit(&self) -> Duration {
        self.budget.mul_f32(1.0 + self.tolerance)
    }
}

/// A channel value a scenario must reach at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub at: AudioTime,
    pub channel: &'static str,
    pub at_least: f32,
}

/// A scripted utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: &'static str,
    pub events: Vec<PhonemeEvent>,
    /// Checked on the composed target at neutral emotion, broad rig
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    /// Bilabial, open vowel, pause
    pub fn reference() -> Self {
        Self {
            name: "reference",
            events: vec![
                PhonemeEvent::new("P", 0.0, 0.1),
                PhonemeEvent::new("AA", 0.1, 0.4),
                PhonemeEvent::new("sil", 0.4, 0.6),
            ],
            expectations: vec![
                Expectation {
                    at: AudioTime::from_millis(50),
                    channel: "viseme_PP",
                    at_least: 0.9,
                },
                Expectation {
                    at: AudioTime::from_millis(250),
                    channel: "viseme_aa",
                    at_least: 0.9,
                },
                Expectation {
                    at: AudioTime::from_millis(500),
                    channel: "viseme_sil",
                    at_least: 0.9,
                },
            ],
        }
    }

    pub fn greeting() -> Self {
        Self {
            name: "greeting",
            events: vec![
                PhonemeEvent::new("HH", 0.0, 0.08),
                PhonemeEvent::new("EH", 0.08, 0.2),
                PhonemeEvent::new("L", 0.2, 0.28),
                PhonemeEvent::new("OW", 0.28, 0.5),
                PhonemeEvent::new("sil", 0.5, 0.7),
            ],
            expectations: Vec::new(),
        }
    }

    pub fn rounded() -> Self {
        Self {
            name: "rounded",
            events: vec![
                PhonemeEvent::new("W", 0.0, 0.1),
                PhonemeEvent::new("UW", 0.1, 0.35),
                PhonemeEvent::new("M", 0.35, 0.45),
                PhonemeEvent::new("AO", 0.45, 0.7),
            ],
            expectations: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self {
            name: "empty",
            events: Vec::new(),
            expectations: Vec::new(),
        }
    }

    /// Scenario length plus a short tail
    fn span(&self) -> AudioTime {
        let end = self.events.iter().map(|e| e.end).max().unwrap_or(AudioTime::ZERO);
        end.saturating_add(Duration::from_millis(200))
    }
}

/// Synthetic checks of the animation pipeline
#[derive(Debug, Clone)]
pub struct ValidationSuite {
    animator: AnimatorConfig,
    performance: PerformanceConfig,
    scenarios: Vec<Scenario>,
    rigs: Vec<Arc<RigDescriptor>>,
}

impl ValidationSuite {
    pub fn new(animator: AnimatorConfig, performance: PerformanceConfig) -> Self {
        Self {
            animator,
            performance,
            scenarios: vec![
                Scenario::reference(),
                Scenario::greeting(),
                Scenario::rounded(),
                Scenario::empty(),
            ],
            rigs: vec![
                Arc::new(RigDescriptor::from_channels("reference-broad", &BROAD_CHANNELS)),
                Arc::new(RigDescriptor::from_channels("reference-fine", &FINE_CHANNELS)),
                Arc::new(RigDescriptor::from_channels("reference-generic", &["MouthOpen"])),
                Arc::new(RigDescriptor::empty("reference-none")),
            ],
        }
    }

    pub fn performance_config(&self) -> &PerformanceConfig {
        &self.performance
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Reference rigs, one per rig class; the broad rig comes first
    pub fn rigs(&self) -> &[Arc<RigDescriptor>] {
        &self.rigs
    }

    fn animator(&self, rig: &Arc<RigDescriptor>, events: &[PhonemeEvent]) -> AvatarAnimator {
        let mut animator = AvatarAnimator::new(self.animator.clone());
        animator.load_rig(rig.clone());
        animator.set_sequence(events.to_vec());
        animator
    }

    /// Bounds and repeatability over every scenario and emotion
    pub fn accuracy(&self) -> CheckOutcome {
        let started = Instant::now();
        let outcome = self.check_accuracy(&self.scenarios);
        outcome.with_elapsed(started.elapsed())
    }

    /// Reduced accuracy run used while the breaker is open
    pub fn probe(&self) -> CheckOutcome {
        let started = Instant::now();
        let outcome = self.check_accuracy(&self.scenarios[..1]);
        outcome.with_elapsed(started.elapsed())
    }

    fn check_accuracy(&self, scenarios: &[Scenario]) -> CheckOutcome {
        let rig = &self.rigs[0];

        for scenario in scenarios {
            for emotion in Emotion::ALL {
                let state = EmotionState::new(emotion, 1.0);
                let mut first = self.animator(rig, &scenario.events);
                let mut second = self.animator(rig, &scenario.events);
                first.set_emotion(state);
                second.set_emotion(state);

                let mut t = AudioTime::ZERO;
                while t <= scenario.span() {
                    let a = first.compose_target(t);
                    if a != second.compose_target(t) {
                        return CheckOutcome::fail(
                            Behavior::Accuracy,
                            format!("{}: non-repeatable target at {t:?} ({emotion:?})", scenario.name),
                            &["check for hidden state in the viseme stages"],
                        );
                    }
                    if !a.as_ref().map_or(false, ChannelWeights::is_bounded) {
                        return CheckOutcome::fail(
                            Behavior::Accuracy,
                            format!("{}: target out of bounds at {t:?} ({emotion:?})", scenario.name),
                            &[
                                "check modulator limits",
                                "check viseme table weights lie in [0, 1]",
                            ],
                        );
                    }
                    t = t + Duration::from_millis(SAMPLE_STEP_MS as u64);
                }

                if let Err(detail) = render_bounded(&mut first, scenario.span()) {
                    return CheckOutcome::fail(
                        Behavior::Accuracy,
                        format!("{}: {detail} ({emotion:?})", scenario.name),
                        &["check interpolator configuration"],
                    );
                }
            }

            let neutral = self.animator(rig, &scenario.events);
            for expect in &scenario.expectations {
                let value = neutral
                    .compose_target(expect.at)
                    .and_then(|w| w.get(expect.channel))
                    .unwrap_or(0.0);
                if value < expect.at_least {
                    return CheckOutcome::fail(
                        Behavior::Accuracy,
                        format!(
                            "{}: {} = {value:.3} at {:?}, expected at least {}",
                            scenario.name, expect.channel, expect.at, expect.at_least
                        ),
                        &["check the viseme table and coarticulation windows"],
                    );
                }
            }
        }

        CheckOutcome::pass(
            Behavior::Accuracy,
            format!("{} scenarios bounded and repeatable", scenarios.len()),
        )
    }

    /// Mean tick latency against the budget
    pub fn performance(&self) -> CheckOutcome {
        let started = Instant::now();
        let scenario = Scenario::reference();
        let mut animator = self.animator(&self.rigs[0], &scenario.events);
        let mut clock = ManualClock::new();

        let timed = Instant::now();
        for _ in 0..self.performance.iterations {
            clock.advance(FRAME);
            // Replay the utterance rather than timing idle frames
            if clock.audio_time().map_or(false, |t| t > scenario.span()) {
                clock = ManualClock::new();
            }
            let _ = animator.tick(&clock, FRAME);
        }
        let mean = timed.elapsed() / self.performance.iterations.max(1);

        self.evaluate_latency(mean).with_elapsed(started.elapsed())
    }

    /// Judge a measured mean tick latency
    pub fn evaluate_latency(&self, mean: Duration) -> CheckOutcome {
        let limit = self.performance.limit();
        if mean <= limit {
            CheckOutcome::pass(
                Behavior::Performance,
                format!("mean tick {mean:?} within {limit:?}"),
            )
        } else {
            CheckOutcome::fail(
                Behavior::Performance,
                format!("mean tick {mean:?} exceeds {limit:?}"),
                &[
                    "reduce the number of animated channels",
                    "check for per-frame allocation",
                    "raise the performance budget for this platform",
                ],
            )
        }
    }

    /// Degraded dependencies still yield valid output
    pub fn fallback(&self) -> CheckOutcome {
        let started = Instant::now();
        let outcome = self.check_fallback();
        outcome.with_elapsed(started.elapsed())
    }

    fn check_fallback(&self) -> CheckOutcome {
        let scenario = Scenario::reference();

        // No channels: the procedural head must move
        let mut head = self.animator(&self.rigs[3], &scenario.events);
        let _ = render_bounded(&mut head, AudioTime::from_millis(350));
        match head.procedural_shape() {
            Some(shape) if shape.mouth_open > 0.5 && shape.mouth_open <= 1.0 => {}
            other => {
                return CheckOutcome::fail(
                    Behavior::Fallback,
                    format!("procedural head did not animate: {other:?}"),
                    &["check rig classification of channel-less avatars"],
                );
            }
        }

        // Empty sequence: breathing only
        let mut idle = self.animator(&self.rigs[0], &[]);
        match render_bounded(&mut idle, AudioTime::from_millis(1000)) {
            Ok(out) if out.values().iter().all(|&v| v <= 0.03) => {}
            Ok(_) => {
                return CheckOutcome::fail(
                    Behavior::Fallback,
                    "idle output exceeds breathing amplitude",
                    &["check silence handler configuration"],
                );
            }
            Err(detail) => {
                return CheckOutcome::fail(
                    Behavior::Fallback,
                    format!("idle: {detail}"),
                    &["check silence handler configuration"],
                );
            }
        }

        // Unavailable clock: neutral output, no panic
        let mut blind = self.animator(&self.rigs[0], &scenario.events);
        let mut clock = ManualClock::new();
        clock.set_available(false);
        let mut output = None;
        for _ in 0..10 {
            output = blind.tick(&clock, FRAME).cloned();
        }
        match output {
            Some(out) if out.values().iter().all(|&v| v == 0.0) => {}
            other => {
                return CheckOutcome::fail(
                    Behavior::Fallback,
                    format!("no neutral output without a clock: {other:?}"),
                    &["check the animator's clock-loss handling"],
                );
            }
        }

        CheckOutcome::pass(
            Behavior::Fallback,
            "procedural head, idle and clock loss produce valid output",
        )
    }

    /// Every rig class bounded, finite and comparable in openness
    pub fn cross_rig(&self) -> CheckOutcome {
        let started = Instant::now();
        let outcome = self.check_cross_rig();
        outcome.with_elapsed(started.elapsed())
    }

    fn check_cross_rig(&self) -> CheckOutcome {
        let scenario = Scenario::reference();
        let animators: Vec<AvatarAnimator> = self
            .rigs
            .iter()
            .map(|rig| self.animator(rig, &scenario.events))
            .collect();

        for ms in CROSS_RIG_SAMPLES_MS {
            let t = AudioTime::from_millis(ms);
            let mut reference = None;

            for animator in &animators {
                let rig = animator
                    .rig_adapter()
                    .map(|a| a.rig().name().to_string())
                    .unwrap_or_default();
                let (Some(adapter), Some(weights)) = (animator.rig_adapter(), animator.compose_target(t))
                else {
                    return CheckOutcome::fail(
                        Behavior::CrossRig,
                        format!("{rig}: no output at {t:?}"),
                        &["check rig loading"],
                    );
                };
                if !weights.is_bounded() {
                    return CheckOutcome::fail(
                        Behavior::CrossRig,
                        format!("{rig}: weights out of bounds at {t:?}"),
                        &["check the rig adapter strategy for this class"],
                    );
                }

                let openness = adapter.mouth_openness(&weights);
                match reference {
                    None => reference = Some(openness),
                    Some(base) => {
                        let diff = (openness - base).abs();
                        if diff > CROSS_RIG_OPENNESS_TOLERANCE {
                            return CheckOutcome::fail(
                                Behavior::CrossRig,
                                format!("{rig}: openness {openness:.3} vs {base:.3} at {t:?}"),
                                &[
                                    "check the fine-grained channel table",
                                    "check generic role guessing",
                                ],
                            );
                        }
                    }
                }
            }
        }

        CheckOutcome::pass(
            Behavior::CrossRig,
            format!("{} rig classes agree", self.rigs.len()),
        )
    }
}

impl Default for ValidationSuite {
    fn default() -> Self {
        Self::new(AnimatorConfig::default(), PerformanceConfig::default())
    }
}

/// Tick at 60 fps up to `until`; fail on the first unbounded output
fn render_bounded(animator: &mut AvatarAnimator, until: AudioTime) -> Result<ChannelWeights, String> {
    let mut clock = ManualClock::new();
    let mut last = None;
    while clock.audio_time().map_or(false, |t| t < until) {
        clock.advance(FRAME);
        let Some(out) = animator.tick(&clock, FRAME) else {
            return Err("no rig loaded".into());
        };
        if !out.is_bounded() {
            return Err(format!("rendered weights out of bounds at {:?}", clock.audio_time()));
        }
        last = Some(out.clone());
    }
    last.ok_or_else(|| "nothing rendered".to_string())
}
