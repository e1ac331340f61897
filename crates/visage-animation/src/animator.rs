//! Avatar Animator - drives the pipeline once per render tick
//!
//! The animator owns the only mutable per-frame state: the frame state of
//! the loaded rig, the silence timer and the speaking-rate window. Every
//! tick runs to completion synchronously and degrades instead of failing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use visage_core::{
    AudioClock, AudioTime, CanonicalVector, EmotionState, FaultCounts, FaultLink, PhonemeEvent,
    PhonemeSequence, ProsodyHint, VisageResult,
};
use visage_rig::{
    write_to_mesh, ChannelWeights, ProceduralHead, ProceduralShape, RigAdapter, RigClass,
    RigDescriptor, RigMesh,
};
use visage_viseme::{table, CoarticulationScheduler, Modulator, ModulatorConfig, ScheduleConfig};

use crate::interpolate::{FrameState, Interpolator, InterpolatorConfig};
use crate::rate::{RateConfig, SpeakingRateStats, SpeakingRateTracker};
use crate::silence::{SilenceConfig, SilenceHandler, SilenceKind, SilenceState};

/// Animator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    pub schedule: ScheduleConfig,
    pub modulator: ModulatorConfig,
    pub interpolator: InterpolatorConfig,
    pub silence: SilenceConfig,
    pub rate: RateConfig,
    /// Drive emotion intensity from the speaking-rate hint
    pub follow_rate_intensity: bool,
}

impl AnimatorConfig {
    /// Snappier transitions for fast, expressive speech
    pub fn responsive() -> Self {
        Self {
            schedule: ScheduleConfig {
                anticipation_window: Duration::from_millis(40),
                ..ScheduleConfig::default()
            },
            interpolator: InterpolatorConfig {
                responsive_speed: 18.0,
                steady_speed: 9.0,
                ..InterpolatorConfig::default()
            },
            ..Self::default()
        }
    }

    /// Smaller, smoother motion (background characters, calm narrators)
    pub fn subtle() -> Self {
        Self {
            schedule: ScheduleConfig {
                anticipation_window: Duration::from_millis(70),
                carryover_strength: 0.5,
                ..ScheduleConfig::default()
            },
            interpolator: InterpolatorConfig {
                responsive_speed: 8.0,
                steady_speed: 4.0,
                perturbation_amplitude: 0.01,
                ..InterpolatorConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> VisageResult<()> {
        self.schedule.validate()?;
        self.modulator.validate()?;
        self.interpolator.validate()?;
        self.silence.validate()?;
        self.rate.validate()?;
        Ok(())
    }
}

/// On-demand introspection for a debug overlay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugSnapshot {
    /// Last clock reading in seconds
    pub audio_time: Option<f64>,
    pub clock_available: bool,
    pub active_phoneme: Option<String>,
    pub rig: Option<String>,
    pub rig_class: Option<RigClass>,
    pub emotion: EmotionState,
    pub prosody: Option<ProsodyHint>,
    pub speaking_rate: Option<SpeakingRateStats>,
    pub is_silent: bool,
    pub silence_kind: Option<SilenceKind>,
    pub stopped: bool,
    pub neutral_override: bool,
    pub target: BTreeMap<String, f32>,
    pub current: BTreeMap<String, f32>,
    pub faults: FaultCounts,
}

impl DebugSnapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Where the target came from on the last tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetSource {
    Speech,
    Silence,
    Neutral,
}

/// Per-avatar animation driver
#[derive(Debug)]
pub struct AvatarAnimator {
    config: AnimatorConfig,
    scheduler: CoarticulationScheduler,
    modulator: Modulator,
    interpolator: Interpolator,
    silence: SilenceHandler,
    rate: SpeakingRateTracker,
    faults: FaultLink,

    adapter: Option<RigAdapter>,
    head: Option<ProceduralHead>,
    frame: Option<FrameState>,
    target: Option<ChannelWeights>,
    output: Option<ChannelWeights>,

    sequence: PhonemeSequence,
    emotion: EmotionState,
    prosody: Option<ProsodyHint>,

    last_time: Option<AudioTime>,
    last_silence: SilenceState,
    active_phoneme: Option<String>,
    clock_lost: bool,
    stopped: bool,
}

impl AvatarAnimator {
    pub fn new(config: AnimatorConfig) -> Self {
        Self::with_fault_link(config, FaultLink::new())
    }

    /// Share a fault link with a health monitor
    pub fn with_fault_link(config: AnimatorConfig, faults: FaultLink) -> Self {
        Self {
            scheduler: CoarticulationScheduler::new(config.schedule.clone()),
            modulator: Modulator::new(config.modulator.clone()),
            interpolator: Interpolator::new(config.interpolator.clone()),
            silence: SilenceHandler::new(config.silence.clone()),
            rate: SpeakingRateTracker::new(config.rate.clone()),
            config,
            faults,
            adapter: None,
            head: None,
            frame: None,
            target: None,
            output: None,
            sequence: PhonemeSequence::empty(),
            emotion: EmotionState::neutral(),
            prosody: None,
            last_time: None,
            last_silence: SilenceState::speaking(),
            active_phoneme: None,
            clock_lost: false,
            stopped: false,
        }
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    pub fn fault_link(&self) -> &FaultLink {
        &self.faults
    }

    // ---- rig lifecycle ----

    /// Load an avatar rig; frame state is created on the next tick
    pub fn load_rig(&mut self, rig: Arc<RigDescriptor>) {
        tracing::info!(
            rig = rig.name(),
            class = ?rig.class(),
            channels = rig.channel_count(),
            "avatar rig loaded"
        );
        let adapter = RigAdapter::new(rig);
        self.head = adapter.uses_procedural_head().then(ProceduralHead::new);
        self.target = Some(adapter.neutral());
        self.output = Some(adapter.neutral());
        self.adapter = Some(adapter);
        self.frame = None;
    }

    /// Classify and load the channels a mesh exposes
    pub fn load_mesh(&mut self, name: &str, mesh: &impl RigMesh) {
        self.load_rig(RigDescriptor::from_mesh(name, mesh));
    }

    /// Discard the rig and its frame state
    pub fn unload_rig(&mut self) {
        if let Some(adapter) = self.adapter.take() {
            tracing::info!(rig = adapter.rig().name(), "avatar rig unloaded");
        }
        self.head = None;
        self.frame = None;
        self.target = None;
        self.output = None;
    }

    pub fn rig_adapter(&self) -> Option<&RigAdapter> {
        self.adapter.as_ref()
    }

    pub fn frame_state(&self) -> Option<&FrameState> {
        self.frame.as_ref()
    }

    // ---- inputs ----

    /// Replace the phoneme sequence
    ///
    /// Malformed sequences are replaced by silence; unknown labels animate
    /// as silence. Both are counted as malformed input.
    pub fn set_sequence(&mut self, events: Vec<PhonemeEvent>) {
        let sequence = match PhonemeSequence::try_new(events) {
            Ok(sequence) => sequence,
            Err(err) => {
                self.faults.record_malformed_input();
                tracing::warn!(error = %err, "malformed phoneme sequence replaced by silence");
                PhonemeSequence::empty()
            }
        };

        let unknown = sequence
            .iter()
            .filter(|e| !table::is_known_label(&e.label))
            .count();
        if unknown > 0 {
            for _ in 0..unknown {
                self.faults.record_malformed_input();
            }
            tracing::warn!(unknown, "unknown phoneme labels animate as silence");
        }

        self.sequence = sequence;
        self.rate.reset();
        self.silence.reset();
        self.stopped = false;
    }

    pub fn sequence(&self) -> &PhonemeSequence {
        &self.sequence
    }

    /// Latest emotion is authoritative until changed
    pub fn set_emotion(&mut self, state: EmotionState) {
        if !(state.intensity.is_finite() && (0.0..=1.0).contains(&state.intensity)) {
            self.faults.record_numeric_fault();
            tracing::warn!(intensity = state.intensity, "emotion intensity out of range");
        }
        self.emotion = EmotionState::new(state.emotion, state.intensity);
    }

    pub fn emotion(&self) -> EmotionState {
        self.emotion
    }

    pub fn set_prosody(&mut self, hint: Option<ProsodyHint>) {
        if let Some(h) = &hint {
            if !(h.pitch_scale.is_finite() && h.stress.is_finite()) {
                self.faults.record_numeric_fault();
                tracing::warn!(?h, "non-finite prosody hint");
            }
        }
        self.prosody = hint.map(|h| ProsodyHint::new(h.pitch_scale, h.stress));
    }

    /// Stop speaking: the face eases back to neutral over one cycle
    pub fn stop(&mut self) {
        self.sequence = PhonemeSequence::empty();
        self.rate.reset();
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Emotion intensity suggested by the current speaking rate
    pub fn suggested_emotion_intensity(&self) -> Option<f32> {
        self.rate.emotion_intensity_hint()
    }

    pub fn speaking_rate(&self) -> Option<&SpeakingRateStats> {
        self.rate.stats()
    }

    // ---- per-frame path ----

    /// Target for `t` without touching any per-frame state
    ///
    /// Gaps are composed as fully relaxed (neutral plus breathing).
    pub fn compose_target(&self, t: AudioTime) -> Option<ChannelWeights> {
        let adapter = self.adapter.as_ref()?;
        let mut out = adapter.neutral();
        let kind = SilenceHandler::classify(t, &self.sequence);
        self.compose_into(adapter, t, kind, &mut out);
        if kind.is_some() {
            add_breathing(adapter, self.silence.breathing(t), &mut out);
        }
        Some(out)
    }

    fn effective_emotion(&self) -> EmotionState {
        match self.rate.emotion_intensity_hint() {
            Some(hint) if self.config.follow_rate_intensity => {
                EmotionState::new(self.emotion.emotion, hint)
            }
            _ => self.emotion,
        }
    }

    /// Scheduler → modulator → adapter for speech and pauses, zeros for gaps
    fn compose_into(
        &self,
        adapter: &RigAdapter,
        t: AudioTime,
        kind: Option<SilenceKind>,
        out: &mut ChannelWeights,
    ) {
        if kind == Some(SilenceKind::Gap) {
            out.clear();
            return;
        }
        let vector = match self.scheduler.active_viseme(t, &self.sequence) {
            Some(active) => {
                self.modulator
                    .modulate(&active.vector, &self.effective_emotion(), self.prosody.as_ref())
            }
            None => CanonicalVector::zero(),
        };
        adapter.adapt_into(&vector, out);
    }

    /// Run one render tick
    ///
    /// Returns the rendered weights, or None when no rig is loaded.
    pub fn tick(&mut self, clock: &impl AudioClock, dt: Duration) -> Option<&ChannelWeights> {
        let adapter = self.adapter.take()?;
        self.tick_with(&adapter, clock, dt);
        self.adapter = Some(adapter);
        self.output.as_ref()
    }

    fn tick_with(&mut self, adapter: &RigAdapter, clock: &impl AudioClock, dt: Duration) {
        let now = match clock.audio_time() {
            Ok(t) => {
                if self.clock_lost {
                    tracing::info!(at = ?t, "audio clock available again");
                    self.clock_lost = false;
                }
                Some(t)
            }
            Err(err) => {
                self.faults.record_dependency_fault();
                if !self.clock_lost {
                    tracing::warn!(error = %err, "audio clock lost, easing to neutral");
                    self.clock_lost = true;
                }
                None
            }
        };

        let mut target = match self.target.take() {
            Some(target) => target,
            None => adapter.neutral(),
        };

        let source = match now {
            Some(t) if !self.stopped && !self.faults.neutral_override() => {
                self.last_time = Some(t);
                self.rate.update(t, &self.sequence);
                let silence = self.silence.handle_silence(t, &self.sequence, dt);
                self.last_silence = silence;
                self.active_phoneme = self
                    .sequence
                    .active_index(t)
                    .and_then(|i| self.sequence.get(i))
                    .map(|e| e.label.clone());

                match silence.kind {
                    // Hold the previous shape through short gaps
                    Some(SilenceKind::Gap) if !silence.neutralize => {
                        if self.frame.is_none() {
                            target.clear();
                        }
                    }
                    kind => {
                        self.compose_into(adapter, t, kind, &mut target);
                        if silence.is_silent {
                            add_breathing(adapter, silence.mouth_open, &mut target);
                        }
                    }
                }
                if silence.is_silent {
                    TargetSource::Silence
                } else {
                    TargetSource::Speech
                }
            }
            _ => {
                target.clear();
                self.active_phoneme = None;
                TargetSource::Neutral
            }
        };

        let frame = self
            .frame
            .get_or_insert_with(|| FrameState::new(adapter.layout().clone()));
        self.interpolator
            .step(frame, &target, dt, self.rate.stats());

        let mut output = match self.output.take() {
            Some(output) => output,
            None => adapter.neutral(),
        };
        let t = self.last_time.unwrap_or(AudioTime::ZERO);
        self.interpolator
            .render_into(frame, t, source == TargetSource::Speech, &mut output);

        if !output.is_bounded() {
            self.faults.record_numeric_fault();
            tracing::warn!("non-finite rendered weights replaced by neutral");
            output.clear();
        }

        if let Some(head) = self.head.as_mut() {
            // Output uses the head's own layout
            let written = write_to_mesh(&output, head);
            debug_assert!(written.is_ok(), "procedural head rejected its own layout: {written:?}");
        }

        self.target = Some(target);
        self.output = Some(output);
    }

    /// Rendered weights of the last tick
    pub fn output(&self) -> Option<&ChannelWeights> {
        self.output.as_ref()
    }

    /// Write the last rendered weights onto the avatar's mesh
    pub fn apply_to_mesh(&self, mesh: &mut impl RigMesh) -> VisageResult<usize> {
        let Some(output) = self.output.as_ref() else {
            return Ok(0);
        };
        write_to_mesh(output, mesh).map_err(|err| {
            self.faults.record_dependency_fault();
            tracing::warn!(error = %err, "mesh write incomplete");
            err
        })
    }

    /// Pose of the built-in head, when the avatar has no channels
    pub fn procedural_shape(&self) -> Option<ProceduralShape> {
        self.head.as_ref().map(ProceduralHead::shape)
    }

    pub fn snapshot(&self) -> DebugSnapshot {
        let named = |weights: Option<&ChannelWeights>| -> BTreeMap<String, f32> {
            weights
                .map(|w| w.iter().map(|(name, v)| (name.to_string(), v)).collect())
                .unwrap_or_default()
        };
        let target = self.frame.as_ref().map(FrameState::target);

        DebugSnapshot {
            audio_time: self.last_time.map(AudioTime::as_secs_f64),
            clock_available: !self.clock_lost,
            active_phoneme: self.active_phoneme.clone(),
            rig: self.adapter.as_ref().map(|a| a.rig().name().to_string()),
            rig_class: self.adapter.as_ref().map(RigAdapter::class),
            emotion: self.emotion,
            prosody: self.prosody,
            speaking_rate: self.rate.stats().copied(),
            is_silent: self.last_silence.is_silent,
            silence_kind: self.last_silence.kind,
            stopped: self.stopped,
            neutral_override: self.faults.neutral_override(),
            target: named(target.as_ref()),
            current: named(self.output.as_ref()),
            faults: self.faults.peek(),
        }
    }
}

fn add_breathing(adapter: &RigAdapter, amplitude: f32, weights: &mut ChannelWeights) {
    for &slot in adapter.breathing_channels() {
        weights.add_to_slot(slot, amplitude);
    }
}
