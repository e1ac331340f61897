//! Playback Clock Simulator
//!
//! Simulates:
//! - Clock drift against the render loop
//! - Per-tick jitter
//! - Drop-outs where the playback device is unavailable

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use visage_core::{AudioClock, AudioTime, VisageError, VisageResult};

/// Drift model for the playback clock
#[derive(Clone, Debug)]
pub struct ClockDrift {
    /// Drift rate (1.0 = perfect, >1.0 = audio runs ahead)
    pub rate: f64,
    /// Random jitter per tick (microseconds)
    pub jitter_us: u32,
}

impl ClockDrift {
    pub fn new(rate: f64, jitter_us: u32) -> Self {
        ClockDrift { rate, jitter_us }
    }

    pub fn perfect() -> Self {
        Self::new(1.0, 0)
    }

    /// Audio device slightly ahead of the display
    pub fn fast() -> Self {
        Self::new(1.002, 200)
    }

    pub fn slow() -> Self {
        Self::new(0.998, 200)
    }

    /// Bursty callbacks, as with large audio buffers
    pub fn unstable() -> Self {
        Self::new(1.0, 4_000)
    }

    /// Audio time elapsed during a render interval `dt`; never negative
    pub fn apply(&self, dt: Duration, rng: &mut StdRng) -> Duration {
        let drifted_us = dt.as_micros() as f64 * self.rate;
        let jitter = if self.jitter_us > 0 {
            rng.gen_range(-(self.jitter_us as i64)..=self.jitter_us as i64) as f64
        } else {
            0.0
        };
        Duration::from_micros((drifted_us + jitter).max(0.0) as u64)
    }
}

/// Playback clock driven by a script
#[derive(Clone, Debug)]
pub struct ScriptedClock {
    now: AudioTime,
    drift: ClockDrift,
    dropouts: Vec<(AudioTime, AudioTime)>,
    rng: StdRng,
}

impl ScriptedClock {
    pub fn new(seed: u64) -> Self {
        ScriptedClock {
            now: AudioTime::ZERO,
            drift: ClockDrift::perfect(),
            dropouts: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_drift(mut self, drift: ClockDrift) -> Self {
        self.drift = drift;
        self
    }

    /// Unavailable during `[start, start + len)`
    pub fn with_dropout(mut self, start: AudioTime, len: Duration) -> Self {
        self.dropouts.push((start, start.saturating_add(len)));
        self
    }

    /// `count` drop-outs of up to `max_len` placed within `span`
    pub fn with_random_dropouts(mut self, count: usize, max_len: Duration, span: Duration) -> Self {
        let span_us = span.as_micros().max(1) as i64;
        let max_us = max_len.as_micros().max(1) as u64;
        for _ in 0..count {
            let start = AudioTime::from_micros(self.rng.gen_range(0..span_us));
            let len = Duration::from_micros(self.rng.gen_range(1..=max_us));
            self.dropouts.push((start, start.saturating_add(len)));
        }
        self
    }

    /// Advance by one render interval; returns the new playback time
    pub fn advance(&mut self, dt: Duration) -> AudioTime {
        let elapsed = self.drift.apply(dt, &mut self.rng);
        self.now = self.now.saturating_add(elapsed);
        self.now
    }

    /// Playback position, whether or not the clock can be read
    pub fn position(&self) -> AudioTime {
        self.now
    }

    pub fn is_available(&self) -> bool {
        !self
            .dropouts
            .iter()
            .any(|&(start, end)| start <= self.now && self.now < end)
    }

    pub fn dropouts(&self) -> &[(AudioTime, AudioTime)] {
        &self.dropouts
    }
}

impl AudioClock for ScriptedClock {
    fn audio_time(&self) -> VisageResult<AudioTime> {
        if self.is_available() {
            Ok(self.now)
        } else {
            Err(VisageError::ClockUnavailable(format!(
                "scripted drop-out at {:?}",
                self.now
            )))
        }
    }
}
