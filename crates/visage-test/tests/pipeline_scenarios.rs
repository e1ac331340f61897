//! End-to-end scenarios: fuzzed speech on every rig class, clock drop-outs,
//! malformed input and the health layer's neutral override.

use std::sync::Arc;
use std::time::{Duration, Instant};

use proptest::prelude::*;
use visage_animation::{AnimatorConfig, AvatarAnimator};
use visage_core::{AudioTime, Emotion, EmotionState, FaultLink, PhonemeEvent};
use visage_health::{BreakerStatus, HealthConfig, HealthMonitor};
use visage_rig::{RigClass, RigDescriptor};
use visage_test::{
    ClockDrift, FuzzerConfig, HarnessConfig, RenderHarness, ScriptedClock, SequenceFuzzer,
};

const OCULUS: [&str; 15] = [
    "viseme_sil", "viseme_PP", "viseme_FF", "viseme_TH", "viseme_DD", "viseme_kk", "viseme_CH",
    "viseme_SS", "viseme_nn", "viseme_RR", "viseme_aa", "viseme_E", "viseme_I", "viseme_O",
    "viseme_U",
];

const ARKIT: [&str; 8] = [
    "jawOpen",
    "jawForward",
    "mouthClose",
    "mouthFunnel",
    "mouthPucker",
    "mouthStretch_L",
    "mouthStretch_R",
    "mouthPressLeft",
];

fn rigs() -> Vec<Arc<RigDescriptor>> {
    vec![
        Arc::new(RigDescriptor::from_channels("broad", &OCULUS)),
        Arc::new(RigDescriptor::from_channels("fine", &ARKIT)),
        Arc::new(RigDescriptor::from_channels("generic", &["Mouth_Open", "Mouth_Closed", "Blink"])),
        Arc::new(RigDescriptor::empty("bare")),
    ]
}

fn animator(rig: &Arc<RigDescriptor>) -> AvatarAnimator {
    let mut animator = AvatarAnimator::new(AnimatorConfig::default());
    animator.load_rig(rig.clone());
    animator
}

#[test]
fn test_reference_rigs_cover_every_class() {
    let classes: Vec<RigClass> = rigs().iter().map(|r| r.class()).collect();
    assert_eq!(classes, RigClass::ALL.to_vec());
}

#[test]
fn test_fuzzed_speech_on_every_rig() {
    let harness = RenderHarness::default();

    for config in [
        FuzzerConfig::light(),
        FuzzerConfig::default(),
        FuzzerConfig::rapid(),
        FuzzerConfig::adversarial(),
    ] {
        let events = SequenceFuzzer::new(config).well_formed();
        for rig in rigs() {
            let mut animator = animator(&rig);
            animator.set_sequence(events.clone());
            let report = harness.run_utterance(&mut animator, &mut ScriptedClock::new(3));

            assert!(report.is_clean(), "{}: {:?}", rig.name(), report.violations);
        }
    }
}

#[test]
fn test_emotions_and_drifting_clocks() {
    let harness = RenderHarness::default();
    let events = SequenceFuzzer::new(FuzzerConfig::default()).well_formed();
    let rig = Arc::new(RigDescriptor::from_channels("broad", &OCULUS));

    for (i, drift) in [ClockDrift::fast(), ClockDrift::slow(), ClockDrift::unstable()]
        .into_iter()
        .enumerate()
    {
        for emotion in Emotion::ALL {
            let mut animator = animator(&rig);
            animator.set_sequence(events.clone());
            animator.set_emotion(EmotionState::new(emotion, 1.0));
            let mut clock = ScriptedClock::new(i as u64).with_drift(drift.clone());

            let report = harness.run_utterance(&mut animator, &mut clock);
            assert!(report.is_clean(), "{emotion:?}: {:?}", report.violations);
        }
    }
}

#[test]
fn test_clock_dropouts_degrade_gracefully() {
    let harness = RenderHarness::default();
    let events = SequenceFuzzer::new(FuzzerConfig::default()).well_formed();
    let span = Duration::from_micros(SequenceFuzzer::end_of(&events).as_micros() as u64);

    for rig in rigs() {
        let mut animator = animator(&rig);
        animator.set_sequence(events.clone());
        let mut clock =
            ScriptedClock::new(9).with_random_dropouts(4, Duration::from_millis(300), span);

        let report = harness.run_utterance(&mut animator, &mut clock);
        assert!(report.is_clean(), "{}: {:?}", rig.name(), report.violations);
        assert!(report.clock_lost_frames > 0);
        assert_eq!(
            animator.fault_link().peek().dependency,
            report.clock_lost_frames
        );
    }
}

#[test]
fn test_malformed_sequences_stay_idle() {
    let harness = RenderHarness::default();
    let mut fuzzer = SequenceFuzzer::new(FuzzerConfig::light());
    let rig = Arc::new(RigDescriptor::from_channels("broad", &OCULUS));

    for _ in 0..10 {
        let case = fuzzer.malformed();
        let mut animator = animator(&rig);
        animator.set_sequence(case.events);
        assert!(animator.sequence().is_empty());

        let report = harness.run(
            &mut animator,
            &mut ScriptedClock::new(1),
            AudioTime::from_millis(800),
            Some(AudioTime::ZERO),
        );
        assert!(report.is_clean(), "{:?}: {:?}", case.defect, report.violations);
        assert_eq!(animator.fault_link().peek().malformed_input, 1);
    }
}

#[test]
fn test_breaker_holds_live_avatar_at_neutral() {
    let faults = FaultLink::new();
    let mut live = AvatarAnimator::with_fault_link(AnimatorConfig::default(), faults.clone());
    live.load_rig(Arc::new(RigDescriptor::from_channels("broad", &OCULUS)));
    let mut monitor = HealthMonitor::new(
        HealthConfig::default(),
        AnimatorConfig::default(),
        faults.clone(),
    );

    // Repeated NaN emotion updates from the host
    let start = Instant::now();
    for _ in 0..5 {
        live.set_emotion(EmotionState {
            emotion: Emotion::Excited,
            intensity: f32::NAN,
        });
        monitor.run_health_checks(start);
    }
    assert_eq!(monitor.breaker().status(), BreakerStatus::Open);
    assert!(faults.neutral_override());
    live.set_emotion(EmotionState::new(Emotion::Neutral, 0.0));

    // Valid speech now, but the override wins
    let events = SequenceFuzzer::new(FuzzerConfig::light()).well_formed();
    live.set_sequence(events.clone());
    let harness = RenderHarness::new(HarnessConfig::default());
    let report = harness.run(
        &mut live,
        &mut ScriptedClock::new(1),
        AudioTime::from_millis(500),
        None,
    );
    assert!(report.is_clean());
    assert!(report.last.unwrap().values().iter().all(|&v| v == 0.0));

    // Cool-down elapsed and a clean probe: the avatar may move again
    monitor.run_health_checks(start + Duration::from_secs(61));
    assert_eq!(monitor.breaker().status(), BreakerStatus::HalfOpen);
    assert!(!faults.neutral_override());

    let report = harness.run(
        &mut live,
        &mut ScriptedClock::new(1),
        SequenceFuzzer::end_of(&events),
        None,
    );
    assert!(report.max_value > 0.3);

    monitor.run_health_checks(start + Duration::from_secs(62));
    assert_eq!(monitor.breaker().status(), BreakerStatus::Closed);
}

#[test]
fn test_unknown_labels_keep_avatar_animating() {
    let faults = FaultLink::new();
    let mut live = AvatarAnimator::with_fault_link(AnimatorConfig::default(), faults.clone());
    live.load_rig(Arc::new(RigDescriptor::from_channels("broad", &OCULUS)));
    let mut monitor = HealthMonitor::new(
        HealthConfig::default(),
        AnimatorConfig::default(),
        faults.clone(),
    );
    let utterance = || {
        vec![
            PhonemeEvent::new("HH", 0.0, 0.1),
            PhonemeEvent::new("QX", 0.1, 0.2),
            PhonemeEvent::new("AA", 0.2, 0.6),
        ]
    };

    // A synthesizer that emits one unlisted label in every utterance
    let start = Instant::now();
    for _ in 0..6 {
        live.set_sequence(utterance());
        monitor.run_health_checks(start);
    }
    assert_eq!(monitor.breaker().status(), BreakerStatus::Closed);
    assert!(!faults.neutral_override());
    assert_eq!(monitor.report(start).faults.malformed_input, 6);

    live.set_sequence(utterance());
    let report = RenderHarness::default().run(
        &mut live,
        &mut ScriptedClock::new(1),
        AudioTime::from_millis(450),
        None,
    );
    assert!(report.is_clean(), "{:?}", report.violations);
    assert!(report.last.unwrap().get("viseme_aa").unwrap() > 0.5);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_fuzzed_output_bounded(seed in any::<u64>(), rig_index in 0usize..4) {
        let events = SequenceFuzzer::new(FuzzerConfig { seed, ..FuzzerConfig::light() }).well_formed();
        let rig = rigs()[rig_index].clone();
        let mut animator = animator(&rig);
        animator.set_sequence(events);

        let report = RenderHarness::default().run_utterance(&mut animator, &mut ScriptedClock::new(seed));
        prop_assert!(report.is_clean(), "{:?}", report.violations);
    }
}
