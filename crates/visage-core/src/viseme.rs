//! Canonical viseme vocabulary
//!
//! Fifteen broad articulatory categories, independent of any avatar rig.
//! Every stage before the rig adapter speaks this vocabulary.

use serde::{Deserialize, Serialize};

/// Articulatory category of the canonical vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisemeCategory {
    Sil, // silence, lips relaxed
    PP,  // "p", "b", "m" (bilabial)
    FF,  // "f", "v" (labiodental)
    TH,  // "th" (dental)
    DD,  // "t", "d" (alveolar)
    KK,  // "k", "g" (velar)
    CH,  // "ch", "sh", "j" (postalveolar)
    SS,  // "s", "z" (sibilant)
    NN,  // "n", "l" (nasal)
    RR,  // "r" (retroflex)
    AA,  // "ah" as in "father" (open)
    E,   // "eh" as in "bed"
    I,   // "ee" as in "see" (close-front)
    O,   // "oh" as in "boat" (rounded)
    U,   // "oo" as in "boot" (rounded, close)
}

/// Number of canonical categories
pub const CATEGORY_COUNT: usize = 15;

impl VisemeCategory {
    /// All categories in index order
    pub const ALL: [VisemeCategory; CATEGORY_COUNT] = [
        VisemeCategory::Sil,
        VisemeCategory::PP,
        VisemeCategory::FF,
        VisemeCategory::TH,
        VisemeCategory::DD,
        VisemeCategory::KK,
        VisemeCategory::CH,
        VisemeCategory::SS,
        VisemeCategory::NN,
        VisemeCategory::RR,
        VisemeCategory::AA,
        VisemeCategory::E,
        VisemeCategory::I,
        VisemeCategory::O,
        VisemeCategory::U,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Conventional channel name (as exposed by broad-viseme rigs)
    pub fn name(self) -> &'static str {
        match self {
            VisemeCategory::Sil => "sil",
            VisemeCategory::PP => "PP",
            VisemeCategory::FF => "FF",
            VisemeCategory::TH => "TH",
            VisemeCategory::DD => "DD",
            VisemeCategory::KK => "kk",
            VisemeCategory::CH => "CH",
            VisemeCategory::SS => "SS",
            VisemeCategory::NN => "nn",
            VisemeCategory::RR => "RR",
            VisemeCategory::AA => "aa",
            VisemeCategory::E => "E",
            VisemeCategory::I => "I",
            VisemeCategory::O => "O",
            VisemeCategory::U => "U",
        }
    }

    /// Case-insensitive lookup by conventional name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn is_silence(self) -> bool {
        self == VisemeCategory::Sil
    }

    pub fn is_vowel(self) -> bool {
        matches!(
            self,
            VisemeCategory::AA
                | VisemeCategory::E
                | VisemeCategory::I
                | VisemeCategory::O
                | VisemeCategory::U
        )
    }

    pub fn is_rounded(self) -> bool {
        matches!(self, VisemeCategory::O | VisemeCategory::U)
    }

    /// Consonants articulated with closed lips
    pub fn is_closed(self) -> bool {
        self == VisemeCategory::PP
    }

    /// Contribution of this category to the mouth-openness scalar
    pub fn openness_weight(self) -> f32 {
        if self.is_silence() {
            0.1
        } else if self.is_vowel() {
            0.8
        } else if self.is_closed() {
            0.2
        } else {
            0.4
        }
    }
}

/// Intensity per canonical category, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalVector {
    weights: [f32; CATEGORY_COUNT],
}

impl CanonicalVector {
    /// All categories at zero (a relaxed, neutral face)
    pub fn zero() -> Self {
        Self::default()
    }

    /// The silence shape
    pub fn silence() -> Self {
        Self::from_weights(&[(VisemeCategory::Sil, 1.0)])
    }

    /// Build from sparse (category, weight) pairs; absent categories are 0
    pub fn from_weights(weights: &[(VisemeCategory, f32)]) -> Self {
        let mut vector = Self::zero();
        for &(category, weight) in weights {
            vector.set(category, weight);
        }
        vector
    }

    #[inline]
    pub fn get(&self, category: VisemeCategory) -> f32 {
        self.weights[category.index()]
    }

    /// Set a weight, clamped to [0, 1]. NaN becomes 0
    #[inline]
    pub fn set(&mut self, category: VisemeCategory, weight: f32) {
        self.weights[category.index()] = unit(weight);
    }

    /// Iterate (category, weight) in index order
    pub fn iter(&self) -> impl Iterator<Item = (VisemeCategory, f32)> + '_ {
        VisemeCategory::ALL
            .iter()
            .map(move |&c| (c, self.weights[c.index()]))
    }

    pub fn as_array(&self) -> &[f32; CATEGORY_COUNT] {
        &self.weights
    }

    /// Linear blend toward `other` (t clamped to [0, 1])
    pub fn lerp(&self, other: &CanonicalVector, t: f32) -> CanonicalVector {
        let t = t.clamp(0.0, 1.0);
        let mut out = *self;
        for (w, o) in out.weights.iter_mut().zip(other.weights.iter()) {
            *w += (o - *w) * t;
        }
        out
    }

    /// Apply a per-category transform; results are written unclamped
    ///
    /// Callers must finish with a limiting step.
    pub fn map_raw(&self, mut f: impl FnMut(VisemeCategory, f32) -> f32) -> RawVector {
        let mut raw = [0.0; CATEGORY_COUNT];
        for c in VisemeCategory::ALL {
            raw[c.index()] = f(c, self.weights[c.index()]);
        }
        RawVector(raw)
    }

    /// Category with the highest weight
    pub fn dominant(&self) -> (VisemeCategory, f32) {
        self.iter()
            .fold((VisemeCategory::Sil, f32::MIN), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            })
    }

    /// Weighted mouth-openness scalar in [0, 1]
    pub fn openness(&self) -> f32 {
        self.iter()
            .map(|(c, w)| w * c.openness_weight())
            .sum::<f32>()
            .clamp(0.0, 1.0)
    }

    /// Largest absolute per-category difference
    pub fn max_abs_diff(&self, other: &CanonicalVector) -> f32 {
        self.weights
            .iter()
            .zip(other.weights.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max)
    }

    /// Every entry finite and within [0, 1]
    pub fn is_bounded(&self) -> bool {
        self.weights
            .iter()
            .all(|w| w.is_finite() && (0.0..=1.0).contains(w))
    }
}

/// Unlimited intermediate values produced by a modulation stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawVector(pub [f32; CATEGORY_COUNT]);

impl RawVector {
    /// Limit each entry with `limit`, producing a bounded vector
    pub fn limit(&self, mut limit: impl FnMut(f32) -> f32) -> CanonicalVector {
        let mut out = CanonicalVector::zero();
        for c in VisemeCategory::ALL {
            out.set(c, limit(self.0[c.index()]));
        }
        out
    }
}

/// Clamp to [0, 1], mapping NaN to 0
#[inline]
pub fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_category_names_roundtrip() {
        for c in VisemeCategory::ALL {
            assert_eq!(VisemeCategory::from_name(c.name()), Some(c));
        }
        assert_eq!(VisemeCategory::from_name("KK"), Some(VisemeCategory::KK));
        assert_eq!(VisemeCategory::from_name("AA"), Some(VisemeCategory::AA));
        assert_eq!(VisemeCategory::from_name("blink"), None);
    }

    #[test]
    fn test_set_clamps_and_rejects_nan() {
        let mut v = CanonicalVector::zero();
        v.set(VisemeCategory::AA, 1.7);
        v.set(VisemeCategory::E, -0.3);
        v.set(VisemeCategory::I, f32::NAN);

        assert_eq!(v.get(VisemeCategory::AA), 1.0);
        assert_eq!(v.get(VisemeCategory::E), 0.0);
        assert_eq!(v.get(VisemeCategory::I), 0.0);
        assert!(v.is_bounded());
    }

    #[test]
    fn test_lerp() {
        let a = CanonicalVector::from_weights(&[(VisemeCategory::PP, 1.0)]);
        let b = CanonicalVector::from_weights(&[(VisemeCategory::AA, 1.0)]);

        let mid = a.lerp(&b, 0.5);
        assert!((mid.get(VisemeCategory::PP) - 0.5).abs() < 1e-6);
        assert!((mid.get(VisemeCategory::AA) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_dominant() {
        let v = CanonicalVector::from_weights(&[
            (VisemeCategory::I, 1.0),
            (VisemeCategory::E, 0.2),
        ]);
        assert_eq!(v.dominant(), (VisemeCategory::I, 1.0));
    }

    #[test]
    fn test_openness_weights() {
        assert!((CanonicalVector::silence().openness() - 0.1).abs() < 1e-6);
        let aa = CanonicalVector::from_weights(&[(VisemeCategory::AA, 1.0)]);
        assert!((aa.openness() - 0.8).abs() < 1e-6);
        let pp = CanonicalVector::from_weights(&[(VisemeCategory::PP, 1.0)]);
        assert!((pp.openness() - 0.2).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_lerp_stays_bounded(
            a in prop::array::uniform15(0.0f32..=1.0),
            b in prop::array::uniform15(0.0f32..=1.0),
            t in -1.0f32..2.0,
        ) {
            let va = RawVector(a).limit(unit);
            let vb = RawVector(b).limit(unit);
            prop_assert!(va.lerp(&vb, t).is_bounded());
        }
    }
}
