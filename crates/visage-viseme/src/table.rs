//! Canonical Viseme Table - phoneme label → canonical vector
//!
//! Weights are design constants, not computed. Most phonemes also light a
//! neighbouring category at partial weight so adjacent sounds never produce
//! unnaturally discrete jumps.

use visage_core::{CanonicalVector, VisemeCategory};

use VisemeCategory::*;

/// Sparse weights for one phoneme
type Weights = &'static [(VisemeCategory, f32)];

const SILENCE: Weights = &[(Sil, 1.0)];

/// Look up the canonical vector for a phoneme label
///
/// Case-insensitive; ARPAbet stress digits are ignored (`AA1` ≡ `AA`).
/// Unknown labels map to the silence vector.
pub fn lookup(label: &str) -> CanonicalVector {
    CanonicalVector::from_weights(weights_for(label))
}

/// Does this label denote a pause rather than a speech sound?
pub fn is_silence_label(label: &str) -> bool {
    weights_for(label) == SILENCE
}

/// Is this label in the table? Unknown labels still look up as silence
pub fn is_known_label(label: &str) -> bool {
    known_weights(label).is_some()
}

fn weights_for(label: &str) -> Weights {
    known_weights(label).unwrap_or(SILENCE)
}

fn known_weights(label: &str) -> Option<Weights> {
    let key = normalize(label);

    let weights: Weights = match key.as_str() {
        "" | "_" | "SIL" | "SP" | "SPN" | "PAU" | "SILENCE" | "X" => SILENCE,
        // Glottal stop
        "Q" => SILENCE,

        // Bilabial
        "P" | "B" | "PP" => &[(PP, 1.0)],
        "M" | "EM" => &[(PP, 1.0), (NN, 0.2)],

        // Labiodental / dental
        "F" | "V" | "FF" => &[(FF, 1.0)],
        "TH" | "DH" => &[(TH, 1.0)],

        // Alveolar / velar
        "T" | "D" | "DD" | "DX" => &[(DD, 1.0)],
        "K" | "G" | "KK" => &[(KK, 1.0)],
        "NG" => &[(NN, 0.8), (KK, 0.4)],

        // Postalveolar / sibilant
        "CH" | "JH" | "SH" | "ZH" => &[(CH, 1.0)],
        "S" | "Z" | "SS" => &[(SS, 1.0)],

        // Nasal / liquid
        "N" | "NN" | "EN" | "NX" => &[(NN, 1.0)],
        "L" | "EL" => &[(NN, 0.6), (DD, 0.4)],
        "R" | "RR" => &[(RR, 1.0)],
        "ER" | "AXR" => &[(RR, 0.8), (E, 0.3)],

        // Glides
        "W" => &[(U, 0.8), (RR, 0.2)],
        "Y" => &[(I, 0.7), (E, 0.2)],
        "HH" => &[(AA, 0.3), (E, 0.2)],

        // Open vowels
        "AA" => &[(AA, 1.0), (O, 0.15)],
        "AE" => &[(AA, 0.7), (E, 0.5)],
        "AH" | "AX" => &[(AA, 0.6), (E, 0.3)],
        "AO" => &[(O, 1.0), (AA, 0.3)],
        "AW" => &[(AA, 0.6), (U, 0.4)],
        "AY" => &[(AA, 0.7), (I, 0.4)],

        // Front vowels
        "EH" | "E" => &[(E, 1.0), (I, 0.2)],
        "EY" => &[(E, 0.8), (I, 0.4)],
        "IH" | "IX" => &[(I, 0.8), (E, 0.3)],
        "IY" | "I" => &[(I, 1.0), (E, 0.2)],

        // Rounded vowels
        "OW" | "O" => &[(O, 1.0), (U, 0.3)],
        "OY" => &[(O, 0.8), (I, 0.3)],
        "UH" => &[(U, 0.8), (O, 0.3)],
        "UW" | "U" | "UX" => &[(U, 1.0), (O, 0.2)],

        _ => return None,
    };
    Some(weights)
}

/// Uppercase, trim, and drop ARPAbet stress markers
fn normalize(label: &str) -> String {
    let trimmed = label.trim();
    let without_stress = trimmed.trim_end_matches(|c: char| c.is_ascii_digit());
    let base = if without_stress.is_empty() {
        trimmed
    } else {
        without_stress
    };
    base.to_ascii_uppercase()
}
