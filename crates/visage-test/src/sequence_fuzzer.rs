//! Phoneme Sequence Fuzzer
//!
//! Generates seeded utterances for the pipeline:
//! - Well-formed sequences with gaps, pauses and unknown labels
//! - Malformed sequences with one structural defect each

use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use visage_core::{AudioTime, PhonemeEvent};

/// Speech labels drawn by the fuzzer
pub const SPEECH_LABELS: [&str; 39] = [
    "AA", "AE", "AH", "AO", "AW", "AY", "B", "CH", "D", "DH", "EH", "ER", "EY", "F", "G", "HH",
    "IH", "IY", "JH", "K", "L", "M", "N", "NG", "OW", "OY", "P", "R", "S", "SH", "T", "TH", "UH",
    "UW", "V", "W", "Y", "Z", "ZH",
];

pub const SILENCE_LABELS: [&str; 3] = ["sil", "sp", "pau"];

/// Labels no table knows
pub const UNKNOWN_LABELS: [&str; 4] = ["QX", "??", "#", "BLAH"];

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Events per sequence
    pub event_count: usize,
    pub min_duration: Duration,
    pub max_duration: Duration,
    /// Probability of a gap before an event
    pub gap_prob: f64,
    pub max_gap: Duration,
    /// Probability of a pause label
    pub silence_prob: f64,
    /// Probability of an unknown label
    pub unknown_prob: f64,
    /// Probability of a zero-length event
    pub zero_length_prob: f64,
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            event_count: 40,
            min_duration: Duration::from_millis(40),
            max_duration: Duration::from_millis(220),
            gap_prob: 0.1,
            max_gap: Duration::from_millis(300),
            silence_prob: 0.1,
            unknown_prob: 0.0,
            zero_length_prob: 0.0,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Short utterances for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            event_count: 12,
            ..Self::default()
        }
    }

    /// Very fast speech
    pub fn rapid() -> Self {
        FuzzerConfig {
            event_count: 60,
            min_duration: Duration::from_millis(20),
            max_duration: Duration::from_millis(60),
            gap_prob: 0.02,
            ..Self::default()
        }
    }

    /// Unknown labels, zero-length events and long gaps
    pub fn adversarial() -> Self {
        FuzzerConfig {
            event_count: 80,
            min_duration: Duration::from_millis(1),
            max_duration: Duration::from_millis(400),
            gap_prob: 0.3,
            max_gap: Duration::from_millis(800),
            silence_prob: 0.2,
            unknown_prob: 0.15,
            zero_length_prob: 0.05,
            seed: 42,
        }
    }
}

/// Structural defect injected into a sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Defect {
    /// An event starts before its predecessor ends
    Overlap,
    /// An event ends before it starts
    EndBeforeStart,
}

/// A malformed sequence and what is wrong with it
#[derive(Clone, Debug)]
pub struct MalformedCase {
    pub events: Vec<PhonemeEvent>,
    pub defect: Defect,
    /// Index of the defective event
    pub index: usize,
}

/// Sequence fuzzer
pub struct SequenceFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
}

impl SequenceFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        SequenceFuzzer { config, rng }
    }

    pub fn config(&self) -> &FuzzerConfig {
        &self.config
    }

    fn label(&mut self) -> &'static str {
        let roll: f64 = self.rng.gen();
        let pool: &[&'static str] = if roll < self.config.unknown_prob {
            &UNKNOWN_LABELS
        } else if roll < self.config.unknown_prob + self.config.silence_prob {
            &SILENCE_LABELS
        } else {
            &SPEECH_LABELS
        };
        pool.choose(&mut self.rng).copied().unwrap_or("sil")
    }

    fn micros(&mut self, min: Duration, max: Duration) -> i64 {
        let lo = min.as_micros() as i64;
        let hi = (max.as_micros() as i64).max(lo);
        self.rng.gen_range(lo..=hi)
    }

    /// Ordered, non-overlapping events
    pub fn well_formed(&mut self) -> Vec<PhonemeEvent> {
        let mut events = Vec::with_capacity(self.config.event_count);
        let mut t = 0i64;

        for _ in 0..self.config.event_count {
            if self.rng.gen_bool(self.config.gap_prob) {
                t += self.micros(Duration::from_millis(1), self.config.max_gap);
            }
            let len = if self.rng.gen_bool(self.config.zero_length_prob) {
                0
            } else {
                self.micros(self.config.min_duration, self.config.max_duration)
            };
            let label = self.label();
            events.push(PhonemeEvent {
                label: label.to_string(),
                start: AudioTime::from_micros(t),
                end: AudioTime::from_micros(t + len),
            });
            t += len;
        }

        events
    }

    /// A well-formed sequence with exactly one structural defect
    pub fn malformed(&mut self) -> MalformedCase {
        let mut events = self.well_formed();
        if events.is_empty() {
            events.push(PhonemeEvent::new("AA", 0.0, 0.1));
        }

        // Overlap needs a predecessor with non-zero length
        let overlap_at: Vec<usize> = (1..events.len())
            .filter(|&i| events[i - 1].end > events[i - 1].start)
            .collect();
        let swap_at: Vec<usize> = (0..events.len())
            .filter(|&i| events[i].end > events[i].start)
            .collect();

        let use_overlap = !overlap_at.is_empty() && (swap_at.is_empty() || self.rng.gen_bool(0.5));
        if use_overlap {
            let index = overlap_at[self.rng.gen_range(0..overlap_at.len())];
            events[index].start = events[index - 1].start;
            MalformedCase {
                events,
                defect: Defect::Overlap,
                index,
            }
        } else {
            let index = match swap_at.choose(&mut self.rng) {
                Some(&i) => i,
                None => {
                    events[0].end = events[0].start.saturating_add(Duration::from_millis(50));
                    0
                }
            };
            let event = &mut events[index];
            std::mem::swap(&mut event.start, &mut event.end);
            MalformedCase {
                events,
                defect: Defect::EndBeforeStart,
                index,
            }
        }
    }

    /// End of a generated sequence
    pub fn end_of(events: &[PhonemeEvent]) -> AudioTime {
        events.iter().map(|e| e.end).max().unwrap_or(AudioTime::ZERO)
    }
}
