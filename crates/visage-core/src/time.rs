//! Time primitives for VISAGE
//!
//! All animation is driven by the playback clock of the audio being spoken,
//! never by wall-clock time. AudioTime is that clock's reading.

use std::ops::{Add, Sub};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{VisageError, VisageResult};

/// Playback time - position of the audio output
/// Represented as microseconds since the start of the utterance
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct AudioTime(pub i64);

impl AudioTime {
    pub const ZERO: AudioTime = AudioTime(0);
    pub const MAX: AudioTime = AudioTime(i64::MAX);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        AudioTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        AudioTime(millis.saturating_mul(1000))
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        AudioTime((secs * 1_000_000.0).round() as i64)
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Signed distance to another time, in seconds
    #[inline]
    pub fn secs_since(self, earlier: AudioTime) -> f64 {
        self.0.saturating_sub(earlier.0) as f64 / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        AudioTime(self.0.saturating_add(duration_micros(duration)))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        AudioTime(self.0.saturating_sub(duration_micros(duration)))
    }
}

#[inline]
fn duration_micros(duration: Duration) -> i64 {
    i64::try_from(duration.as_micros()).unwrap_or(i64::MAX)
}

impl Add<Duration> for AudioTime {
    type Output = AudioTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for AudioTime {
    type Output = AudioTime;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl Sub<AudioTime> for AudioTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: AudioTime) -> Self::Output {
        let diff = self.0.saturating_sub(rhs.0);
        if diff >= 0 {
            Duration::from_micros(diff as u64)
        } else {
            Duration::ZERO
        }
    }
}

impl std::fmt::Debug for AudioTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "τa({:.3}s)", self.as_secs_f64())
    }
}

/// The audio playback clock
///
/// Readings must be monotonically non-decreasing while audio plays.
/// An error means the clock is currently unavailable (device lost,
/// playback torn down); callers treat it as a dependency failure.
pub trait AudioClock {
    fn audio_time(&self) -> VisageResult<AudioTime>;
}

/// Clock driven explicitly by the host (or a test)
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: AudioTime,
    available: bool,
}

impl ManualClock {
    /// Create an available clock at zero
    pub fn new() -> Self {
        Self {
            now: AudioTime::ZERO,
            available: true,
        }
    }

    /// Create an available clock at a given time
    pub fn at(now: AudioTime) -> Self {
        Self {
            now,
            available: true,
        }
    }

    /// Move the clock forward. Backwards moves are ignored
    pub fn set(&mut self, now: AudioTime) {
        if now > self.now {
            self.now = now;
        }
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    /// Simulate the playback device going away or coming back
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for ManualClock {
    fn audio_time(&self) -> VisageResult<AudioTime> {
        if self.available {
            Ok(self.now)
        } else {
            Err(VisageError::ClockUnavailable("manual clock disabled".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_time_secs_roundtrip() {
        let t = AudioTime::from_secs_f64(0.25);
        assert_eq!(t.as_micros(), 250_000);
        assert!((t.as_secs_f64() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_audio_time_sub_saturates() {
        let t1 = AudioTime::from_millis(100);
        let t2 = AudioTime::from_millis(150);

        assert_eq!(t2 - t1, Duration::from_millis(50));
        assert_eq!(t1 - t2, Duration::ZERO);
        assert!((t1.secs_since(t2) + 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_duration_arithmetic_saturates() {
        assert_eq!(AudioTime::from_millis(i64::MAX), AudioTime::MAX);
        assert_eq!(AudioTime::MAX + Duration::from_secs(1), AudioTime::MAX);
        assert_eq!(AudioTime(i64::MIN) - Duration::from_secs(1), AudioTime(i64::MIN));
        assert_eq!(AudioTime::ZERO + Duration::MAX, AudioTime::MAX);
        assert_eq!(AudioTime::MAX - AudioTime(i64::MIN), Duration::from_micros(i64::MAX as u64));
        assert_eq!(
            AudioTime::from_millis(10) + Duration::from_millis(5),
            AudioTime::from_millis(15)
        );
    }

    #[test]
    fn test_manual_clock_monotonic() {
        let mut clock = ManualClock::new();
        clock.set(AudioTime::from_millis(200));
        clock.set(AudioTime::from_millis(100));

        assert_eq!(clock.audio_time().unwrap(), AudioTime::from_millis(200));

        clock.advance(Duration::from_millis(16));
        assert_eq!(clock.audio_time().unwrap(), AudioTime::from_millis(216));
    }

    #[test]
    fn test_manual_clock_unavailable() {
        let mut clock = ManualClock::new();
        clock.set_available(false);

        assert!(matches!(
            clock.audio_time(),
            Err(VisageError::ClockUnavailable(_))
        ));
    }
}
