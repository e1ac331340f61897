//! Rig Adapter - canonical vector → the rig's own channels
//!
//! The strategy is chosen from the rig class at load time. Every strategy
//! writes into a slot array laid out by the rig's own indices, so the
//! per-frame path never touches a channel name.

use std::sync::Arc;

use visage_core::{unit, CanonicalVector, VisemeCategory};

use crate::descriptor::{FineChannel, GenericRole, RigClass, RigDescriptor};
use crate::procedural::{self, ProceduralHead};

/// Documented agreement between mouth-openness derived from different rigs
pub const CROSS_RIG_OPENNESS_TOLERANCE: f32 = 0.25;

/// How much rounding adds to openness on a fine-grained rig
const FINE_ROUNDING_OPENNESS: f32 = 0.2;

/// Per-slot intensities for one rig
///
/// Slots follow the rig dictionary's indices; gaps stay at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelWeights {
    layout: Arc<RigDescriptor>,
    values: Vec<f32>,
}

impl ChannelWeights {
    /// All channels at zero
    pub fn neutral(layout: Arc<RigDescriptor>) -> Self {
        let values = vec![0.0; layout.slot_count()];
        Self { layout, values }
    }

    pub fn layout(&self) -> &Arc<RigDescriptor> {
        &self.layout
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Intensity of a named channel
    pub fn get(&self, channel: &str) -> Option<f32> {
        self.layout
            .index_of(channel)
            .and_then(|i| self.values.get(i).copied())
    }

    #[inline]
    pub fn slot(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    /// Set a slot, clamped to [0, 1]. Out-of-range slots are ignored
    #[inline]
    pub fn set_slot(&mut self, index: usize, value: f32) {
        if let Some(v) = self.values.get_mut(index) {
            *v = unit(value);
        }
    }

    /// Add to a slot, clamped to [0, 1]
    #[inline]
    pub fn add_to_slot(&mut self, index: usize, delta: f32) {
        if let Some(v) = self.values.get_mut(index) {
            *v = unit(*v + delta);
        }
    }

    /// (channel name, intensity) in index order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.layout
            .named_slots()
            .map(move |(i, name)| (name, self.slot(i)))
    }

    /// Zero every slot
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Replace contents from a slot slice of the same layout
    pub fn copy_from_slots(&mut self, slots: &[f32]) {
        for (v, s) in self.values.iter_mut().zip(slots) {
            *v = unit(*s);
        }
    }

    pub fn max_abs_diff(&self, other: &ChannelWeights) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }

    /// Every slot finite and within [0, 1]
    pub fn is_bounded(&self) -> bool {
        self.values
            .iter()
            .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }
}

/// Fixed mapping per rig class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Broad,
    Fine,
    Generic,
    Procedural,
}

/// Converts canonical vectors for one loaded rig
#[derive(Debug, Clone)]
pub struct RigAdapter {
    rig: Arc<RigDescriptor>,
    layout: Arc<RigDescriptor>,
    strategy: Strategy,
    breathing: Vec<usize>,
}

impl RigAdapter {
    /// Pick the strategy for a rig
    ///
    /// A rig with no channels is served by the procedural head, whose own
    /// channels become the output layout.
    pub fn new(rig: Arc<RigDescriptor>) -> Self {
        let (strategy, layout) = match rig.class() {
            RigClass::BroadViseme => (Strategy::Broad, rig.clone()),
            RigClass::FineGrained => (Strategy::Fine, rig.clone()),
            RigClass::Generic => (Strategy::Generic, rig.clone()),
            RigClass::None => (Strategy::Procedural, Arc::new(ProceduralHead::descriptor())),
        };

        let breathing = match strategy {
            Strategy::Broad => rig.broad_slot(VisemeCategory::AA).into_iter().collect(),
            Strategy::Fine => rig.fine_slots(FineChannel::JawOpen).to_vec(),
            Strategy::Generic => open_slots(&rig).collect(),
            Strategy::Procedural => layout.index_of(procedural::MOUTH_OPEN).into_iter().collect(),
        };

        tracing::debug!(
            rig = rig.name(),
            class = ?rig.class(),
            channels = rig.channel_count(),
            "rig adapter ready"
        );

        Self {
            rig,
            layout,
            strategy,
            breathing,
        }
    }

    /// The rig as loaded
    pub fn rig(&self) -> &Arc<RigDescriptor> {
        &self.rig
    }

    /// Layout of the weights this adapter produces
    pub fn layout(&self) -> &Arc<RigDescriptor> {
        &self.layout
    }

    pub fn class(&self) -> RigClass {
        self.rig.class()
    }

    /// Is output going to the built-in head rather than the avatar?
    pub fn uses_procedural_head(&self) -> bool {
        self.strategy == Strategy::Procedural
    }

    /// Slots that carry idle breathing motion
    pub fn breathing_channels(&self) -> &[usize] {
        &self.breathing
    }

    /// All-zero weights in this adapter's layout
    pub fn neutral(&self) -> ChannelWeights {
        ChannelWeights::neutral(self.layout.clone())
    }

    pub fn adapt(&self, vector: &CanonicalVector) -> ChannelWeights {
        let mut out = self.neutral();
        self.adapt_into(vector, &mut out);
        out
    }

    /// Allocation-free variant for the per-frame path
    ///
    /// `out` must share this adapter's layout; anything else is reset first.
    pub fn adapt_into(&self, vector: &CanonicalVector, out: &mut ChannelWeights) {
        if !Arc::ptr_eq(&out.layout, &self.layout) {
            *out = self.neutral();
        }
        out.clear();

        match self.strategy {
            Strategy::Broad => {
                for (category, weight) in vector.iter() {
                    if let Some(slot) = self.rig.broad_slot(category) {
                        out.set_slot(slot, weight);
                    }
                }
            }
            Strategy::Fine => {
                let mut fine = [0.0f32; crate::descriptor::FINE_CHANNEL_COUNT];
                for (category, weight) in vector.iter() {
                    for &(channel, k) in fine_table(category) {
                        fine[channel.index()] += weight * k;
                    }
                }
                for channel in FineChannel::ALL {
                    let value = unit(fine[channel.index()]);
                    for &slot in self.rig.fine_slots(channel) {
                        out.set_slot(slot, value);
                    }
                }
            }
            Strategy::Generic => {
                let openness = vector.openness();
                let closure = vector.get(VisemeCategory::PP);
                for &(slot, role) in self.rig.generic_slots() {
                    match role {
                        GenericRole::Open => out.set_slot(slot, openness),
                        GenericRole::Close => out.set_slot(slot, closure),
                    }
                }
            }
            Strategy::Procedural => {
                let shape = ProceduralHead::shape_for(vector);
                for (name, value) in shape.channels() {
                    if let Some(slot) = self.layout.index_of(name) {
                        out.set_slot(slot, value);
                    }
                }
            }
        }
    }

    /// Mouth-openness scalar derived from adapted weights
    ///
    /// Comparable across rig classes within [`CROSS_RIG_OPENNESS_TOLERANCE`].
    pub fn mouth_openness(&self, weights: &ChannelWeights) -> f32 {
        match self.strategy {
            Strategy::Broad => {
                let mut vector = CanonicalVector::zero();
                for category in VisemeCategory::ALL {
                    if let Some(slot) = self.rig.broad_slot(category) {
                        vector.set(category, weights.slot(slot));
                    }
                }
                vector.openness()
            }
            Strategy::Fine => {
                let first = |ch: FineChannel| {
                    self.rig
                        .fine_slots(ch)
                        .first()
                        .map(|&s| weights.slot(s))
                        .unwrap_or(0.0)
                };
                let rounding = first(FineChannel::MouthFunnel).max(first(FineChannel::MouthPucker));
                unit(first(FineChannel::JawOpen) + FINE_ROUNDING_OPENNESS * rounding)
            }
            Strategy::Generic => open_slots(&self.rig)
                .map(|s| weights.slot(s))
                .fold(0.0, f32::max),
            Strategy::Procedural => self
                .layout
                .index_of(procedural::MOUTH_OPEN)
                .map(|s| weights.slot(s))
                .unwrap_or(0.0),
        }
    }
}

fn open_slots(rig: &RigDescriptor) -> impl Iterator<Item = usize> + '_ {
    rig.generic_slots()
        .iter()
        .filter(|(_, role)| *role == GenericRole::Open)
        .map(|(slot, _)| *slot)
}

/// Canonical category → weighted jaw/mouth channels
pub fn fine_table(category: VisemeCategory) -> &'static [(FineChannel, f32)] {
    use FineChannel::*;
    use VisemeCategory as V;

    match category {
        V::Sil => &[],
        V::PP => &[(MouthPress, 0.7), (MouthClose, 0.6), (JawOpen, 0.15)],
        V::FF => &[(MouthRollLower, 0.7), (MouthUpperUp, 0.3), (JawOpen, 0.2)],
        V::TH | V::DD => &[(JawOpen, 0.35), (MouthStretch, 0.2)],
        V::KK => &[(JawOpen, 0.4), (MouthStretch, 0.15)],
        V::CH => &[(MouthFunnel, 0.6), (MouthPucker, 0.3), (JawOpen, 0.3)],
        V::SS => &[(MouthStretch, 0.5), (JawOpen, 0.3)],
        V::NN => &[(JawOpen, 0.3), (MouthClose, 0.15)],
        V::RR => &[(MouthPucker, 0.4), (MouthFunnel, 0.2), (JawOpen, 0.35)],
        V::AA => &[(JawOpen, 0.8)],
        V::E => &[(JawOpen, 0.7), (MouthStretch, 0.4)],
        V::I => &[(JawOpen, 0.6), (MouthStretch, 0.5)],
        V::O => &[(JawOpen, 0.7), (MouthFunnel, 0.6), (JawForward, 0.1)],
        V::U => &[(JawOpen, 0.6), (MouthPucker, 0.8), (MouthFunnel, 0.2)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visage_viseme::table;

    const OCULUS: [&str; 15] = [
        "viseme_sil", "viseme_PP", "viseme_FF", "viseme_TH", "viseme_DD", "viseme_kk",
        "viseme_CH", "viseme_SS", "viseme_nn", "viseme_RR", "viseme_aa", "viseme_E",
        "viseme_I", "viseme_O", "viseme_U",
    ];

    const ARKIT: [&str; 14] = [
        "jawOpen",
        "jawForward",
        "mouthClose",
        "mouthFunnel",
        "mouthPucker",
        "mouthRollLower",
        "mouthRollUpper",
        "mouthStretch_L",
        "mouthStretch_R",
        "mouthUpperUp_L",
        "mouthUpperUp_R",
        "mouthPressLeft",
        "mouthPressRight",
        "eyeBlinkLeft",
    ];

    fn adapter(channels: &[&str]) -> RigAdapter {
        RigAdapter::new(Arc::new(RigDescriptor::from_channels("test", channels)))
    }

    #[test]
    fn test_broad_is_identity() {
        let adapter = adapter(&OCULUS);
        let weights = adapter.adapt(&table::lookup("AA"));

        assert_eq!(weights.get("viseme_aa"), Some(1.0));
        assert!((weights.get("viseme_O").unwrap() - 0.15).abs() < 1e-6);
        assert_eq!(weights.get("viseme_PP"), Some(0.0));
    }

    #[test]
    fn test_broad_missing_category_contributes_nothing() {
        let adapter = adapter(&OCULUS[..12]);
        let weights = adapter.adapt(&table::lookup("OW"));

        assert!(weights.is_bounded());
        assert!(weights.iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_fine_vowel_drives_jaw() {
        let adapter = adapter(&ARKIT);
        let weights = adapter.adapt(&table::lookup("AA"));

        let jaw = weights.get("jawOpen").unwrap();
        assert!((0.6..=1.0).contains(&jaw));
        assert_eq!(weights.get("eyeBlinkLeft"), Some(0.0));
    }

    #[test]
    fn test_fine_rounded_vowel_pushes_lips() {
        let adapter = adapter(&ARKIT);
        let weights = adapter.adapt(&table::lookup("UW"));

        assert!(weights.get("mouthPucker").unwrap() > 0.5);
        assert!(weights.get("jawOpen").unwrap() > 0.5);
    }

    #[test]
    fn test_fine_sided_channels_match() {
        let adapter = adapter(&ARKIT);
        let weights = adapter.adapt(&table::lookup("IY"));

        assert!(weights.get("mouthStretch_L").unwrap() > 0.0);
        assert_eq!(weights.get("mouthStretch_L"), weights.get("mouthStretch_R"));
    }

    #[test]
    fn test_generic_heuristic() {
        let adapter = adapter(&["MouthOpen", "mouth_close", "Blink"]);
        let weights = adapter.adapt(&table::lookup("AA"));

        assert!((weights.get("MouthOpen").unwrap() - 0.92).abs() < 1e-4);
        assert_eq!(weights.get("mouth_close"), Some(0.0));
        assert_eq!(weights.get("Blink"), Some(0.0));

        let closed = adapter.adapt(&table::lookup("P"));
        assert_eq!(closed.get("mouth_close"), Some(1.0));
    }

    #[test]
    fn test_unrecognized_generic_stays_zero() {
        let adapter = adapter(&["Blink", "Smile"]);
        let weights = adapter.adapt(&table::lookup("AA"));
        assert!(weights.values().iter().all(|&v| v == 0.0));
        assert!(adapter.breathing_channels().is_empty());
    }

    #[test]
    fn test_no_channels_routes_to_procedural_head() {
        let adapter = RigAdapter::new(Arc::new(RigDescriptor::empty("bare")));
        assert!(adapter.uses_procedural_head());

        let weights = adapter.adapt(&table::lookup("AA"));
        assert!(weights.get(procedural::MOUTH_OPEN).unwrap() > 0.5);
        assert_eq!(adapter.breathing_channels().len(), 1);
    }

    #[test]
    fn test_adapt_into_reuses_buffer() {
        let adapter = adapter(&OCULUS);
        let mut out = adapter.neutral();
        adapter.adapt_into(&table::lookup("P"), &mut out);
        assert_eq!(out.get("viseme_PP"), Some(1.0));

        adapter.adapt_into(&table::lookup("AA"), &mut out);
        assert_eq!(out.get("viseme_PP"), Some(0.0));
        assert_eq!(out.get("viseme_aa"), Some(1.0));
    }

    #[test]
    fn test_cross_rig_openness() {
        let broad = adapter(&OCULUS);
        let fine = adapter(&ARKIT);
        let generic = adapter(&["jaw_open", "hair"]);
        let head = RigAdapter::new(Arc::new(RigDescriptor::empty("none")));

        let labels = [
            "sil", "P", "M", "F", "TH", "T", "K", "NG", "CH", "S", "N", "L", "R", "ER", "W",
            "Y", "HH", "AA", "AE", "AH", "AO", "AW", "AY", "EH", "EY", "IH", "IY", "OW",
            "OY", "UH", "UW",
        ];
        for label in labels {
            let v = table::lookup(label);
            let reference = broad.mouth_openness(&broad.adapt(&v));
            for other in [&fine, &generic, &head] {
                let o = other.mouth_openness(&other.adapt(&v));
                assert!(
                    (o - reference).abs() <= CROSS_RIG_OPENNESS_TOLERANCE,
                    "{label}: {o} vs {reference} on {:?}",
                    other.class()
                );
            }
        }
    }

    #[test]
    fn test_breathing_channels_per_class() {
        assert_eq!(adapter(&OCULUS).breathing_channels(), &[10]);
        assert_eq!(adapter(&ARKIT).breathing_channels(), &[0]);
        assert_eq!(adapter(&["mouthOpen"]).breathing_channels(), &[0]);
    }
}
