//! Benchmarks for the per-frame animation path

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use visage_animation::{AnimatorConfig, AvatarAnimator};
use visage_core::{AudioClock, AudioTime, ManualClock, PhonemeEvent, PhonemeSequence};
use visage_rig::{RigAdapter, RigDescriptor};
use visage_test::{FuzzerConfig, SequenceFuzzer};
use visage_viseme::{lookup, CoarticulationScheduler, ScheduleConfig};

const FRAME: Duration = Duration::from_micros(16_667);

const OCULUS: [&str; 15] = [
    "viseme_sil", "viseme_PP", "viseme_FF", "viseme_TH", "viseme_DD", "viseme_kk", "viseme_CH",
    "viseme_SS", "viseme_nn", "viseme_RR", "viseme_aa", "viseme_E", "viseme_I", "viseme_O",
    "viseme_U",
];

fn rigs() -> Vec<Arc<RigDescriptor>> {
    vec![
        Arc::new(RigDescriptor::from_channels("broad", &OCULUS)),
        Arc::new(RigDescriptor::from_channels(
            "fine",
            &["jawOpen", "mouthClose", "mouthFunnel", "mouthPucker", "mouthStretch_L", "mouthPressLeft"],
        )),
        Arc::new(RigDescriptor::from_channels("generic", &["MouthOpen", "MouthClose"])),
        Arc::new(RigDescriptor::empty("bare")),
    ]
}

fn utterance() -> Vec<PhonemeEvent> {
    SequenceFuzzer::new(FuzzerConfig::default()).well_formed()
}

fn bench_tick_by_rig(c: &mut Criterion) {
    let events = utterance();
    let end = SequenceFuzzer::end_of(&events);

    let mut group = c.benchmark_group("tick_by_rig");

    for rig in rigs() {
        let mut animator = AvatarAnimator::new(AnimatorConfig::default());
        animator.load_rig(rig.clone());
        animator.set_sequence(events.clone());
        let mut clock = ManualClock::new();

        group.bench_function(rig.name(), |b| {
            b.iter(|| {
                clock.advance(FRAME);
                if clock.audio_time().map_or(false, |t| t > end) {
                    clock = ManualClock::new();
                }
                black_box(animator.tick(&clock, FRAME).map(|w| w.len()))
            })
        });
    }

    group.finish();
}

fn bench_compose_target(c: &mut Criterion) {
    let mut animator = AvatarAnimator::new(AnimatorConfig::default());
    animator.load_rig(Arc::new(RigDescriptor::from_channels("broad", &OCULUS)));
    animator.set_sequence(utterance());
    let t = AudioTime::from_millis(750);

    c.bench_function("compose_target", |b| {
        b.iter(|| black_box(animator.compose_target(black_box(t))))
    });
}

fn bench_active_viseme(c: &mut Criterion) {
    let sequence = PhonemeSequence::sanitized(utterance());
    let scheduler = CoarticulationScheduler::new(ScheduleConfig::default());
    let t = AudioTime::from_millis(750);

    c.bench_function("active_viseme", |b| {
        b.iter(|| black_box(scheduler.active_viseme(black_box(t), &sequence)))
    });
}

fn bench_adapt(c: &mut Criterion) {
    let vector = lookup("AA");
    let mut group = c.benchmark_group("adapt");

    for rig in rigs() {
        let adapter = RigAdapter::new(rig.clone());
        let mut out = adapter.neutral();
        group.bench_function(rig.name(), |b| {
            b.iter(|| {
                adapter.adapt_into(black_box(&vector), &mut out);
                black_box(out.values().len())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_tick_by_rig,
    bench_compose_target,
    bench_active_viseme,
    bench_adapt
);
criterion_main!(benches);
