//! Phoneme events and sequences
//!
//! A sequence is produced by the speech-synthesis collaborator and is a
//! read-only snapshot for the duration of a tick.

use serde::{Deserialize, Serialize};

use crate::{AudioTime, VisageError, VisageResult};

/// One speech sound with its playback interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhonemeEvent {
    /// Phoneme label (ARPAbet, viseme name or silence marker)
    pub label: String,
    /// Start of the sound
    pub start: AudioTime,
    /// End of the sound (exclusive)
    pub end: AudioTime,
}

impl PhonemeEvent {
    /// Create an event from times in seconds
    pub fn new(label: impl Into<String>, start_secs: f64, end_secs: f64) -> Self {
        Self {
            label: label.into(),
            start: AudioTime::from_secs_f64(start_secs),
            end: AudioTime::from_secs_f64(end_secs),
        }
    }

    /// Duration in seconds (0 for zero-length events)
    pub fn duration_secs(&self) -> f64 {
        self.end.secs_since(self.start).max(0.0)
    }

    /// Is this event sounding at `t`?
    ///
    /// Zero-duration events are active only at exactly their start.
    #[inline]
    pub fn is_active_at(&self, t: AudioTime) -> bool {
        if self.start == self.end {
            t == self.start
        } else {
            self.start <= t && t < self.end
        }
    }
}

/// Ordered, non-overlapping list of phoneme events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhonemeSequence {
    events: Vec<PhonemeEvent>,
}

impl PhonemeSequence {
    /// Empty sequence (continuous silence)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and wrap a list of events
    pub fn try_new(events: Vec<PhonemeEvent>) -> VisageResult<Self> {
        for (index, event) in events.iter().enumerate() {
            if event.end < event.start {
                return Err(VisageError::MalformedSequence {
                    index,
                    reason: format!("end {:?} before start {:?}", event.end, event.start),
                });
            }
            if index > 0 && event.start < events[index - 1].end {
                return Err(VisageError::MalformedSequence {
                    index,
                    reason: format!(
                        "starts at {:?}, before previous event ends at {:?}",
                        event.start,
                        events[index - 1].end
                    ),
                });
            }
        }

        Ok(Self { events })
    }

    /// Validate, falling back to continuous silence on malformed input
    pub fn sanitized(events: Vec<PhonemeEvent>) -> Self {
        match Self::try_new(events) {
            Ok(sequence) => sequence,
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed phoneme sequence");
                Self::empty()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PhonemeEvent> {
        self.events.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhonemeEvent> {
        self.events.iter()
    }

    /// Event before `index`, if any
    pub fn previous(&self, index: usize) -> Option<&PhonemeEvent> {
        index.checked_sub(1).and_then(|i| self.events.get(i))
    }

    /// Event after `index`, if any
    pub fn next(&self, index: usize) -> Option<&PhonemeEvent> {
        self.events.get(index + 1)
    }

    /// Index of the event sounding at `t`
    pub fn active_index(&self, t: AudioTime) -> Option<usize> {
        // Last event starting at or before t
        let candidate = self.events.partition_point(|e| e.start <= t).checked_sub(1)?;
        if self.events[candidate].is_active_at(t) {
            Some(candidate)
        } else {
            None
        }
    }

    /// Events starting within `[from, to)`
    pub fn starting_between(
        &self,
        from: AudioTime,
        to: AudioTime,
    ) -> impl Iterator<Item = &PhonemeEvent> {
        let lo = self.events.partition_point(|e| e.start < from);
        let hi = self.events.partition_point(|e| e.start < to);
        self.events[lo..hi.max(lo)].iter()
    }

    /// End of the last event
    pub fn end_time(&self) -> AudioTime {
        self.events.last().map(|e| e.end).unwrap_or(AudioTime::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PhonemeSequence {
        PhonemeSequence::try_new(vec![
            PhonemeEvent::new("P", 0.0, 0.1),
            PhonemeEvent::new("AA", 0.1, 0.4),
            PhonemeEvent::new("sil", 0.4, 0.6),
        ])
        .unwrap()
    }

    #[test]
    fn test_active_index() {
        let seq = sample();

        assert_eq!(seq.active_index(AudioTime::from_secs_f64(0.05)), Some(0));
        assert_eq!(seq.active_index(AudioTime::from_secs_f64(0.1)), Some(1));
        assert_eq!(seq.active_index(AudioTime::from_secs_f64(0.5)), Some(2));
        assert_eq!(seq.active_index(AudioTime::from_secs_f64(0.6)), None);
        assert_eq!(seq.active_index(AudioTime::from_secs_f64(-0.1)), None);
    }

    #[test]
    fn test_gap_has_no_active_event() {
        let seq = PhonemeSequence::try_new(vec![
            PhonemeEvent::new("AA", 0.0, 0.1),
            PhonemeEvent::new("IY", 0.3, 0.4),
        ])
        .unwrap();

        assert_eq!(seq.active_index(AudioTime::from_secs_f64(0.2)), None);
    }

    #[test]
    fn test_zero_duration_event() {
        let seq = PhonemeSequence::try_new(vec![PhonemeEvent::new("T", 0.2, 0.2)]).unwrap();

        assert_eq!(seq.active_index(AudioTime::from_secs_f64(0.2)), Some(0));
        assert_eq!(seq.active_index(AudioTime::from_secs_f64(0.21)), None);
    }

    #[test]
    fn test_overlap_rejected() {
        let result = PhonemeSequence::try_new(vec![
            PhonemeEvent::new("AA", 0.0, 0.3),
            PhonemeEvent::new("IY", 0.2, 0.4),
        ]);

        assert!(matches!(
            result,
            Err(VisageError::MalformedSequence { index: 1, .. })
        ));
    }

    #[test]
    fn test_reversed_event_rejected() {
        let result = PhonemeSequence::try_new(vec![PhonemeEvent::new("AA", 0.3, 0.1)]);
        assert!(matches!(
            result,
            Err(VisageError::MalformedSequence { index: 0, .. })
        ));
    }

    #[test]
    fn test_sanitized_falls_back_to_silence() {
        let seq = PhonemeSequence::sanitized(vec![
            PhonemeEvent::new("AA", 0.2, 0.3),
            PhonemeEvent::new("IY", 0.0, 0.1),
        ]);
        assert!(seq.is_empty());
    }

    #[test]
    fn test_starting_between() {
        let seq = sample();
        let labels: Vec<_> = seq
            .starting_between(AudioTime::from_secs_f64(0.05), AudioTime::from_secs_f64(0.5))
            .map(|e| e.label.as_str())
            .collect();

        assert_eq!(labels, vec!["AA", "sil"]);
    }
}
