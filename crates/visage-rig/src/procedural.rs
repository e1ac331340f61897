//! Procedural fallback head
//!
//! Used when an avatar exposes no channels at all. Three channels are
//! enough to read as speech: how open the mouth is, how wide, how round.

use std::collections::HashMap;

use serde::Serialize;
use visage_core::{unit, CanonicalVector, VisemeCategory};

use crate::descriptor::RigDescriptor;
use crate::mesh::RigMesh;

pub const MOUTH_OPEN: &str = "mouthOpen";
pub const MOUTH_WIDE: &str = "mouthWide";
pub const LIPS_ROUND: &str = "lipsRound";

/// Channels of the procedural head, in index order
pub const PROCEDURAL_CHANNELS: [&str; 3] = [MOUTH_OPEN, MOUTH_WIDE, LIPS_ROUND];

/// Resting mouth size in head-relative units
const REST_WIDTH: f32 = 0.30;
const REST_HEIGHT: f32 = 0.02;
const MAX_DROP: f32 = 0.12;

/// Procedural mouth pose
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProceduralShape {
    pub mouth_open: f32,
    pub mouth_wide: f32,
    pub lips_round: f32,
}

impl ProceduralShape {
    /// (channel name, intensity) pairs
    pub fn channels(&self) -> [(&'static str, f32); 3] {
        [
            (MOUTH_OPEN, self.mouth_open),
            (MOUTH_WIDE, self.mouth_wide),
            (LIPS_ROUND, self.lips_round),
        ]
    }

    /// Mouth ellipse (width, height) for a host drawing the head
    pub fn mouth_extent(&self) -> (f32, f32) {
        let width = REST_WIDTH * (1.0 + 0.3 * self.mouth_wide - 0.4 * self.lips_round);
        let height = REST_HEIGHT + MAX_DROP * self.mouth_open;
        (width, height)
    }
}

/// Built-in head with its own minimal channel set
#[derive(Debug, Clone)]
pub struct ProceduralHead {
    dictionary: HashMap<String, usize>,
    intensities: [f32; 3],
}

impl Default for ProceduralHead {
    fn default() -> Self {
        Self::new()
    }
}

impl ProceduralHead {
    pub fn new() -> Self {
        let dictionary = PROCEDURAL_CHANNELS
            .iter()
            .enumerate()
            .map(|(i, c)| (c.to_string(), i))
            .collect();
        Self {
            dictionary,
            intensities: [0.0; 3],
        }
    }

    /// Descriptor for the head's channels
    pub fn descriptor() -> RigDescriptor {
        RigDescriptor::from_channels("procedural-head", &PROCEDURAL_CHANNELS)
    }

    /// Pose for a canonical vector
    pub fn shape_for(vector: &CanonicalVector) -> ProceduralShape {
        use VisemeCategory::*;
        ProceduralShape {
            mouth_open: vector.openness(),
            mouth_wide: unit(vector.get(I) + 0.7 * vector.get(E) + 0.5 * vector.get(SS)),
            lips_round: unit(
                vector.get(U) + 0.8 * vector.get(O) + 0.5 * vector.get(CH) + 0.3 * vector.get(RR),
            ),
        }
    }

    /// Current pose as written by the animator
    pub fn shape(&self) -> ProceduralShape {
        ProceduralShape {
            mouth_open: self.intensities[0],
            mouth_wide: self.intensities[1],
            lips_round: self.intensities[2],
        }
    }
}

impl RigMesh for ProceduralHead {
    fn channel_dictionary(&self) -> &HashMap<String, usize> {
        &self.dictionary
    }

    fn intensities_mut(&mut self) -> &mut [f32] {
        &mut self.intensities
    }
}
