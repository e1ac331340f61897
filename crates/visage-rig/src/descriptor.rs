//! Rig Descriptor - the channels an avatar exposes, classified once

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use visage_core::{VisemeCategory, CATEGORY_COUNT};

/// Minimum canonical channels for a broad-viseme rig
pub const BROAD_VISEME_THRESHOLD: usize = 10;

/// Minimum vocabulary channels for a fine-grained rig
pub const FINE_GRAINED_THRESHOLD: usize = 6;

/// Highest mesh index accepted from a channel dictionary
pub const MAX_CHANNEL_INDEX: usize = 4095;

/// Capability class of a rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RigClass {
    /// One channel per canonical category
    BroadViseme,
    /// Jaw and lip controls
    FineGrained,
    /// Named channels with no known vocabulary
    Generic,
    /// No channels at all
    None,
}

impl RigClass {
    pub const ALL: [RigClass; 4] = [
        RigClass::BroadViseme,
        RigClass::FineGrained,
        RigClass::Generic,
        RigClass::None,
    ];
}

/// Fine-grained jaw/mouth vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FineChannel {
    JawOpen,
    JawForward,
    MouthClose,
    MouthFunnel,
    MouthPucker,
    MouthRollLower,
    MouthRollUpper,
    MouthStretch,
    MouthUpperUp,
    MouthPress,
}

/// Number of fine-grained vocabulary entries
pub const FINE_CHANNEL_COUNT: usize = 10;

impl FineChannel {
    pub const ALL: [FineChannel; FINE_CHANNEL_COUNT] = [
        FineChannel::JawOpen,
        FineChannel::JawForward,
        FineChannel::MouthClose,
        FineChannel::MouthFunnel,
        FineChannel::MouthPucker,
        FineChannel::MouthRollLower,
        FineChannel::MouthRollUpper,
        FineChannel::MouthStretch,
        FineChannel::MouthUpperUp,
        FineChannel::MouthPress,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Accepted names after normalization (lowercase, no separators)
    ///
    /// Sided controls (left/right) all resolve to the same vocabulary entry.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            FineChannel::JawOpen => &["jawopen"],
            FineChannel::JawForward => &["jawforward"],
            FineChannel::MouthClose => &["mouthclose"],
            FineChannel::MouthFunnel => &["mouthfunnel"],
            FineChannel::MouthPucker => &["mouthpucker"],
            FineChannel::MouthRollLower => &["mouthrolllower"],
            FineChannel::MouthRollUpper => &["mouthrollupper"],
            FineChannel::MouthStretch => &[
                "mouthstretch",
                "mouthstretchleft",
                "mouthstretchright",
                "mouthstretchl",
                "mouthstretchr",
            ],
            FineChannel::MouthUpperUp => &[
                "mouthupperup",
                "mouthupperupleft",
                "mouthupperupright",
                "mouthupperupl",
                "mouthupperupr",
            ],
            FineChannel::MouthPress => &[
                "mouthpress",
                "mouthpressleft",
                "mouthpressright",
                "mouthpressl",
                "mouthpressr",
            ],
        }
    }

    fn matching(normalized: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ch| ch.aliases().contains(&normalized))
    }
}

/// What a generic channel is assumed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenericRole {
    /// Opens the mouth or jaw, or is a catch-all viseme/phoneme slider
    Open,
    /// Closes the lips
    Close,
}

impl GenericRole {
    /// Best-effort guess from a channel name; None means "leave at 0"
    pub fn guess(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if (lower.contains("mouth") || lower.contains("jaw")) && lower.contains("open") {
            Some(GenericRole::Open)
        } else if lower.contains("mouth") && lower.contains("close") {
            Some(GenericRole::Close)
        } else if lower.contains("viseme") || lower.contains("phoneme") {
            Some(GenericRole::Open)
        } else {
            None
        }
    }
}

/// Immutable description of a loaded avatar's channels
///
/// Reloading an avatar produces a new descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct RigDescriptor {
    name: String,
    dictionary: HashMap<String, usize>,
    /// Channel name per mesh index (None for gaps)
    slots: Vec<Option<String>>,
    class: RigClass,
    broad: [Option<usize>; CATEGORY_COUNT],
    fine: [Vec<usize>; FINE_CHANNEL_COUNT],
    generic: Vec<(usize, GenericRole)>,
}

impl RigDescriptor {
    /// Classify a channel dictionary (`name → mesh index`)
    ///
    /// Entries with an index above [`MAX_CHANNEL_INDEX`] are dropped.
    pub fn new(name: impl Into<String>, mut dictionary: HashMap<String, usize>) -> Self {
        let name = name.into();
        dictionary.retain(|channel, &mut index| {
            if index > MAX_CHANNEL_INDEX {
                tracing::warn!(rig = %name, %channel, index, "channel index out of range, ignored");
                return false;
            }
            true
        });

        let len = dictionary
            .values()
            .max()
            .and_then(|m| m.checked_add(1))
            .unwrap_or(0);
        let mut slots = vec![None; len];
        // Sorted for a deterministic winner when names share an index
        let mut entries: Vec<_> = dictionary.iter().collect();
        entries.sort();
        for &(channel, &index) in &entries {
            if slots[index].is_none() {
                slots[index] = Some(channel.clone());
            }
        }

        let mut broad = [None; CATEGORY_COUNT];
        let mut fine: [Vec<usize>; FINE_CHANNEL_COUNT] = Default::default();
        let mut generic = Vec::new();

        for &(channel, &index) in &entries {
            if let Some(category) = broad_category(channel) {
                if broad[category.index()].is_none() {
                    broad[category.index()] = Some(index);
                }
            }
            if let Some(fine_channel) = FineChannel::matching(&normalize(channel)) {
                if !fine[fine_channel.index()].contains(&index) {
                    fine[fine_channel.index()].push(index);
                }
            }
            if let Some(role) = GenericRole::guess(channel) {
                generic.push((index, role));
            }
        }

        let broad_count = broad.iter().filter(|s| s.is_some()).count();
        let fine_count = fine.iter().filter(|s| !s.is_empty()).count();

        let class = if broad_count >= BROAD_VISEME_THRESHOLD {
            RigClass::BroadViseme
        } else if fine_count >= FINE_GRAINED_THRESHOLD {
            RigClass::FineGrained
        } else if !dictionary.is_empty() {
            RigClass::Generic
        } else {
            RigClass::None
        };

        Self {
            name,
            dictionary,
            slots,
            class,
            broad,
            fine,
            generic,
        }
    }

    /// Convenience: channels at consecutive indices
    pub fn from_channels(name: impl Into<String>, channels: &[&str]) -> Self {
        let dictionary = channels
            .iter()
            .enumerate()
            .map(|(i, c)| (c.to_string(), i))
            .collect();
        Self::new(name, dictionary)
    }

    /// Descriptor for an avatar with no channels
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, HashMap::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> RigClass {
        self.class
    }

    pub fn dictionary(&self) -> &HashMap<String, usize> {
        &self.dictionary
    }

    /// Length of the intensity array this rig needs
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn channel_count(&self) -> usize {
        self.dictionary.len()
    }

    pub fn index_of(&self, channel: &str) -> Option<usize> {
        self.dictionary.get(channel).copied()
    }

    pub fn slot_name(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|s| s.as_deref())
    }

    /// Named slots in index order
    pub fn named_slots(&self) -> impl Iterator<Item = (usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_deref().map(|name| (i, name)))
    }

    /// Slot driven by a canonical category on a broad-viseme rig
    pub fn broad_slot(&self, category: VisemeCategory) -> Option<usize> {
        self.broad[category.index()]
    }

    /// Slots driven by a fine-grained vocabulary entry
    pub fn fine_slots(&self, channel: FineChannel) -> &[usize] {
        &self.fine[channel.index()]
    }

    /// Slots with a recognized generic role
    pub fn generic_slots(&self) -> &[(usize, GenericRole)] {
        &self.generic
    }

    /// How many canonical channels this rig exposes
    pub fn broad_coverage(&self) -> usize {
        self.broad.iter().filter(|s| s.is_some()).count()
    }

    /// How many fine-grained vocabulary entries this rig exposes
    pub fn fine_coverage(&self) -> usize {
        self.fine.iter().filter(|s| !s.is_empty()).count()
    }
}

/// `viseme_aa`, `aa`, `VISEME_AA` → AA
fn broad_category(channel: &str) -> Option<VisemeCategory> {
    let lower = channel.to_ascii_lowercase();
    let bare = lower.strip_prefix("viseme_").unwrap_or(&lower);
    VisemeCategory::from_name(bare)
}

/// Lowercase and drop separators
fn normalize(channel: &str) -> String {
    channel
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
