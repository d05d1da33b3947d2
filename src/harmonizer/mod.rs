//! Harmonizers: cross-attribute coordinators
//!
//! A harmonizer collects a *pitch* from every harmonized attribute that names
//! it (absorb), computes all outputs at once (harmonize), then hands each
//! attribute its share (reflect). Per frame the status only moves forward:
//!
//! ```text
//! Unused --first pitch--> Absorbing --harmonize--> Reflecting
//! ```

pub mod bin_pack;
pub mod packer;
pub mod permutate;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_yaml::{Mapping, Value};

use crate::description::Node;
use crate::value::Bindings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HarmonizerId(pub(crate) usize);

impl HarmonizerId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Harmonizer {
    pub name: String,
    pub kind: HarmonizerKind,
}

#[derive(Debug, Clone)]
pub enum HarmonizerKind {
    Permutate,
    BinPack {
        bin_size: Node,
        /// `index`/`count` visible while resolving `bin_size`
        bindings: Bindings,
    },
}

impl HarmonizerKind {
    pub fn harmonizer_type(&self) -> HarmonizerType {
        match self {
            HarmonizerKind::Permutate => HarmonizerType::Permutate,
            HarmonizerKind::BinPack { .. } => HarmonizerType::BinPack,
        }
    }
}

/// Values accepted for the `harmonizer_type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmonizerType {
    Permutate,
    BinPack,
}

impl HarmonizerType {
    pub fn as_str(self) -> &'static str {
        match self {
            HarmonizerType::Permutate => "permutate",
            HarmonizerType::BinPack => "bin_pack",
        }
    }
}

impl FromStr for HarmonizerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permutate" => Ok(HarmonizerType::Permutate),
            "bin_pack" => Ok(HarmonizerType::BinPack),
            other => Err(format!("unrecognized harmonizer type \"{other}\"")),
        }
    }
}

impl fmt::Display for HarmonizerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HarmonizerStatus {
    #[default]
    Unused,
    Absorbing,
    Reflecting,
}

/// Per-frame state of one harmonizer.
#[derive(Debug, Clone, Default)]
pub struct HarmonizerState {
    pub status: HarmonizerStatus,
    /// Pitches in absorption order
    pub input: Vec<(String, Value)>,
    pub output: HashMap<String, Value>,
    /// Last `bin_size` used by a bin-pack harmonizer
    pub resolved_bin_size: Option<Value>,
}

impl HarmonizerState {
    /// Record `pitch` for `element`. A repeated pitch replaces the earlier one in place.
    pub fn absorb(&mut self, element: &str, pitch: Value) {
        match self.input.iter_mut().find(|(name, _)| name == element) {
            Some(slot) => slot.1 = pitch,
            None => self.input.push((element.to_string(), pitch)),
        }
    }

    pub fn reflect(&self, element: &str) -> Option<&Value> {
        self.output.get(element)
    }

    /// Back to `Unused` with no input or output; the last bin size is kept for reporting.
    pub fn reset(&mut self) {
        self.status = HarmonizerStatus::Unused;
        self.input.clear();
        self.output.clear();
    }
}

impl Harmonizer {
    /// What a harmonizer looks like in the produced description.
    pub fn representation(&self, state: &HarmonizerState) -> Value {
        let mut repr = Mapping::new();
        repr.insert(
            Value::from("harmonizer_type"),
            Value::from(self.kind.harmonizer_type().as_str()),
        );
        if let HarmonizerKind::BinPack { .. } = self.kind {
            repr.insert(
                Value::from("bin_size"),
                state.resolved_bin_size.clone().unwrap_or(Value::Null),
            );
        }
        Value::Mapping(repr)
    }
}

/// Supplies local-space bounding boxes for `pitch: local_aabb`.
///
/// Object geometry lives outside this crate; the scene-construction side
/// implements this once objects exist.
pub trait PitchSource {
    /// `[min, max]` corners of the object owning the harmonized attribute at `element_path`.
    fn local_aabb(&self, element_path: &str) -> Option<[[f64; 3]; 2]>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_keeps_order_and_replaces() {
        let mut state = HarmonizerState::default();
        state.absorb("/a", Value::from(1));
        state.absorb("/b", Value::from(2));
        state.absorb("/a", Value::from(3));
        assert_eq!(
            state.input,
            vec![("/a".to_string(), Value::from(3)), ("/b".to_string(), Value::from(2))]
        );
    }

    #[test]
    fn test_reset_clears_frame_state() {
        let mut state = HarmonizerState {
            status: HarmonizerStatus::Reflecting,
            ..Default::default()
        };
        state.absorb("/a", Value::from(1));
        state.output.insert("/a".to_string(), Value::from(1));
        state.reset();
        assert_eq!(state.status, HarmonizerStatus::Unused);
        assert!(state.input.is_empty());
        assert!(state.reflect("/a").is_none());
    }

    #[test]
    fn test_representation() {
        let h = Harmonizer {
            name: "/packer".to_string(),
            kind: HarmonizerKind::BinPack {
                bin_size: Node::Literal(Value::Null),
                bindings: Bindings::new(),
            },
        };
        let repr = h.representation(&HarmonizerState::default());
        let expected: Value = serde_yaml::from_str("{harmonizer_type: bin_pack, bin_size: null}").unwrap();
        assert_eq!(repr, expected);
    }
}
