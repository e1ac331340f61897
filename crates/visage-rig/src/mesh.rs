//! Mesh seam - the host's blend-shape target
//!
//! This core reads the channel dictionary and writes the intensity array.
//! It never loads or disposes a mesh.

use std::collections::HashMap;
use std::sync::Arc;

use visage_core::{VisageError, VisageResult};

use crate::adapter::ChannelWeights;
use crate::descriptor::RigDescriptor;

/// A mesh with animatable blend channels
pub trait RigMesh {
    /// Channel name → intensity index
    fn channel_dictionary(&self) -> &HashMap<String, usize>;

    /// Mutable intensity array, indexed by the dictionary
    fn intensities_mut(&mut self) -> &mut [f32];
}

impl RigDescriptor {
    /// Classify the channels a mesh exposes
    pub fn from_mesh(name: impl Into<String>, mesh: &impl RigMesh) -> Arc<RigDescriptor> {
        Arc::new(RigDescriptor::new(name, mesh.channel_dictionary().clone()))
    }
}

/// Plain in-memory mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendShapeMesh {
    dictionary: HashMap<String, usize>,
    intensities: Vec<f32>,
}

impl BlendShapeMesh {
    /// Channels at consecutive indices, all at zero
    pub fn with_channels(channels: &[&str]) -> Self {
        let dictionary: HashMap<String, usize> = channels
            .iter()
            .enumerate()
            .map(|(i, c)| (c.to_string(), i))
            .collect();
        Self {
            intensities: vec![0.0; channels.len()],
            dictionary,
        }
    }

    /// Explicit dictionary with an intensity array of `len`
    pub fn new(dictionary: HashMap<String, usize>, len: usize) -> Self {
        Self {
            dictionary,
            intensities: vec![0.0; len],
        }
    }

    pub fn intensity(&self, channel: &str) -> Option<f32> {
        self.dictionary
            .get(channel)
            .and_then(|&i| self.intensities.get(i).copied())
    }

    pub fn intensities(&self) -> &[f32] {
        &self.intensities
    }
}

impl RigMesh for BlendShapeMesh {
    fn channel_dictionary(&self) -> &HashMap<String, usize> {
        &self.dictionary
    }

    fn intensities_mut(&mut self) -> &mut [f32] {
        &mut self.intensities
    }
}

/// Write weights onto a mesh
///
/// Every in-range channel is written even when some are not. Returns the
/// number of channels written, or the first out-of-range channel.
pub fn write_to_mesh(weights: &ChannelWeights, mesh: &mut impl RigMesh) -> VisageResult<usize> {
    let layout = weights.layout();
    let intensities = mesh.intensities_mut();
    let len = intensities.len();

    let mut written = 0;
    let mut first_error = None;

    for (index, channel) in layout.named_slots() {
        match intensities.get_mut(index) {
            Some(slot) => {
                *slot = weights.slot(index);
                written += 1;
            }
            None => {
                if first_error.is_none() {
                    first_error = Some(VisageError::ChannelIndexOutOfRange {
                        channel: channel.to_string(),
                        index,
                        len,
                    });
                }
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(written),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RigAdapter;
    use visage_viseme::table;

    #[test]
    fn test_write_roundtrip() {
        let mut mesh = BlendShapeMesh::with_channels(&["jaw_open", "blink"]);
        let adapter = RigAdapter::new(RigDescriptor::from_mesh("toon", &mesh));

        let weights = adapter.adapt(&table::lookup("AA"));
        assert_eq!(write_to_mesh(&weights, &mut mesh), Ok(2));
        assert!(mesh.intensity("jaw_open").unwrap() > 0.9);
        assert_eq!(mesh.intensity("blink"), Some(0.0));
    }

    #[test]
    fn test_short_intensity_array() {
        let mut dictionary = HashMap::new();
        dictionary.insert("mouthOpen".to_string(), 0);
        dictionary.insert("jawOpen".to_string(), 3);
        let mut mesh = BlendShapeMesh::new(dictionary, 2);

        let adapter = RigAdapter::new(RigDescriptor::from_mesh("short", &mesh));
        let weights = adapter.adapt(&table::lookup("AA"));

        let err = write_to_mesh(&weights, &mut mesh).unwrap_err();
        assert_eq!(
            err,
            VisageError::ChannelIndexOutOfRange {
                channel: "jawOpen".into(),
                index: 3,
                len: 2,
            }
        );
        // Valid channels still written
        assert!(mesh.intensity("mouthOpen").unwrap() > 0.9);
    }
}
