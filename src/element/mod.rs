//! Mutable elements: lazily resolved attribute nodes
//!
//! Elements live in the description's arena and are addressed by
//! [`ElementId`]. Their per-frame state (resolved flag, cached value) is kept
//! separately in [`crate::description::FrameState`] so the graph itself never
//! changes after construction.

mod distribution;
mod expression;
pub mod folder;
mod harmonized;

use std::fmt;
use std::str::FromStr;

use crate::description::{Node, Resolution, Resolver};
use crate::value::{merged, Bindings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    /// Slash-delimited attribute path, used for diagnostics and seeding
    pub name: String,
    pub kind: ElementKind,
    /// `index`/`count` overrides inherited from an enclosing harmonized attribute
    pub bindings: Bindings,
}

/// A `$[...]` placeholder inside an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Macro {
    /// Plain reference path
    Path(String),
    /// Placeholder containing placeholders; the inner expression yields the path
    Nested { source: String, path: ElementId },
}

impl Macro {
    /// The exact text this placeholder occupies in its template.
    pub fn placeholder(&self) -> String {
        match self {
            Macro::Path(path) => format!("$[{path}]"),
            Macro::Nested { source, .. } => format!("$[{source}]"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ElementKind {
    Reference {
        path: String,
    },
    Expression {
        template: String,
        macros: Vec<Macro>,
    },
    Range {
        start: Node,
        end: Node,
        seed: Option<Node>,
    },
    Set {
        values: Node,
        index: Option<Node>,
        seed: Option<Node>,
    },
    Folder {
        folder: Node,
        suffix: Node,
        index: Option<Node>,
        seed: Option<Node>,
    },
    CameraFrustum {
        camera_parameters: Node,
        distance_min: Node,
        distance_max: Node,
        screen_space_range: Node,
    },
    Geometry {
        file: Node,
    },
    Texture {
        operation: Node,
    },
    Harmonized {
        harmonizer_name: Node,
        pitch: Node,
        /// Own `index`/`count`, exposed to the pitch and harmonizer name
        overlay: Bindings,
    },
}

impl ElementKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Reference { .. } => "reference",
            ElementKind::Expression { .. } => "expression",
            ElementKind::Range { .. } => DistributionType::Range.as_str(),
            ElementKind::Set { .. } => DistributionType::Set.as_str(),
            ElementKind::Folder { .. } => DistributionType::Folder.as_str(),
            ElementKind::CameraFrustum { .. } => DistributionType::CameraFrustum.as_str(),
            ElementKind::Geometry { .. } => DistributionType::Geometry.as_str(),
            ElementKind::Texture { .. } => DistributionType::Texture.as_str(),
            ElementKind::Harmonized { .. } => DistributionType::Harmonized.as_str(),
        }
    }

    pub fn is_harmonized(&self) -> bool {
        matches!(self, ElementKind::Harmonized { .. })
    }
}

impl<'d> Resolver<'d> {
    /// Compute an element's value for this pass. Called by `element_value`,
    /// which handles memoization and cycle detection.
    pub(crate) fn resolve_element(&mut self, element: &'d Element) -> Resolution {
        let scope = merged(self.mapping, &element.bindings);
        match &element.kind {
            ElementKind::Reference { path } => self.lookup(&element.name, path, &scope),
            ElementKind::Expression { template, macros } => {
                self.resolve_expression(element, template, macros, &scope)
            }
            ElementKind::Range { start, end, seed } => {
                self.resolve_range(element, start, end, seed.as_ref(), &scope)
            }
            ElementKind::Set { values, index, seed } => {
                self.resolve_set(element, values, index.as_ref(), seed.as_ref(), &scope)
            }
            ElementKind::Folder {
                folder,
                suffix,
                index,
                seed,
            } => self.resolve_folder(element, folder, suffix, index.as_ref(), seed.as_ref(), &scope),
            ElementKind::CameraFrustum {
                camera_parameters,
                distance_min,
                distance_max,
                screen_space_range,
            } => self.resolve_camera_frustum(
                element,
                [camera_parameters, distance_min, distance_max, screen_space_range],
                &scope,
            ),
            ElementKind::Geometry { file } => self.resolve_node(file, &scope),
            ElementKind::Texture { operation } => self.resolve_texture(element, operation, &scope),
            ElementKind::Harmonized {
                harmonizer_name,
                pitch,
                overlay,
            } => self.resolve_harmonized(element, harmonizer_name, pitch, overlay),
        }
    }
}

/// Values accepted for the `distribution_type` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionType {
    Range,
    Set,
    Folder,
    CameraFrustum,
    Harmonized,
    Geometry,
    Texture,
}

impl DistributionType {
    pub fn as_str(self) -> &'static str {
        match self {
            DistributionType::Range => "range",
            DistributionType::Set => "set",
            DistributionType::Folder => "folder",
            DistributionType::CameraFrustum => "camera_frustum",
            DistributionType::Harmonized => "harmonized",
            DistributionType::Geometry => "geometry",
            DistributionType::Texture => "texture",
        }
    }
}

impl FromStr for DistributionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "range" => Ok(DistributionType::Range),
            "set" => Ok(DistributionType::Set),
            "folder" => Ok(DistributionType::Folder),
            "camera_frustum" => Ok(DistributionType::CameraFrustum),
            "harmonized" => Ok(DistributionType::Harmonized),
            "geometry" => Ok(DistributionType::Geometry),
            "texture" => Ok(DistributionType::Texture),
            other => Err(format!("unrecognized distribution type \"{other}\"")),
        }
    }
}

impl fmt::Display for DistributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_type_round_trip() {
        for ty in [
            DistributionType::Range,
            DistributionType::Set,
            DistributionType::Folder,
            DistributionType::CameraFrustum,
            DistributionType::Harmonized,
            DistributionType::Geometry,
            DistributionType::Texture,
        ] {
            assert_eq!(ty.as_str().parse::<DistributionType>(), Ok(ty));
        }
        assert!("gaussian".parse::<DistributionType>().is_err());
    }

    #[test]
    fn test_macro_placeholder_text() {
        assert_eq!(Macro::Path("../a".into()).placeholder(), "$[../a]");
        let nested = Macro::Nested {
            source: "/o/$[n]".into(),
            path: ElementId(3),
        };
        assert_eq!(nested.placeholder(), "$[/o/$[n]]");
    }
}
