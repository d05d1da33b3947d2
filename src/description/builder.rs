//! Graph construction from a flattened configuration tree.
//!
//! Walks the tree depth-first, naming each position by its path
//! (`/key` for mapping entries, `~i` for list items). Strings holding `$[...]`
//! become reference or expression elements; mappings carrying a
//! `distribution_type` or `harmonizer_type` become elements or harmonizers.

use serde_yaml::{Mapping, Value};

use super::graph::{Graph, Node};
use crate::element::{DistributionType, Element, ElementId, ElementKind, Macro};
use crate::error::{DescriptionError, Result};
use crate::harmonizer::{Harmonizer, HarmonizerKind, HarmonizerType};
use crate::macros::{extract_macros, has_macro, single_reference};
use crate::reference::{child_path, item_path};
use crate::value::{key_text, merged, Bindings};

const DISTRIBUTION_TYPE: &str = "distribution_type";
const HARMONIZER_TYPE: &str = "harmonizer_type";

/// Build the graph for `config` (the root mapping of a description).
pub fn build_graph(config: &Value) -> Result<Graph> {
    let mut builder = GraphBuilder {
        graph: Graph {
            context: Node::Literal(Value::Null),
            elements: Vec::new(),
            harmonizers: Vec::new(),
        },
    };
    let context = builder.node("", config, &Bindings::new())?;
    builder.graph.context = context;
    Ok(builder.graph)
}

struct GraphBuilder {
    graph: Graph,
}

fn required<'a>(name: &str, map: &'a Mapping, key: &str) -> Result<&'a Value> {
    map.get(key)
        .ok_or_else(|| DescriptionError::config(name, format!("\"{key}\" expected but not found")))
}

fn type_tag<'a>(name: &str, map: &'a Mapping, key: &str) -> Result<&'a str> {
    required(name, map, key)?
        .as_str()
        .ok_or_else(|| DescriptionError::config(name, format!("\"{key}\" must be a string")))
}

impl GraphBuilder {
    fn node(&mut self, name: &str, value: &Value, bindings: &Bindings) -> Result<Node> {
        match value {
            Value::String(text) => Ok(self.string(name, text, bindings)),
            Value::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.node(&item_path(name, i), item, bindings))
                .collect::<Result<Vec<_>>>()
                .map(Node::List),
            Value::Mapping(map) if map.contains_key(DISTRIBUTION_TYPE) => {
                self.distribution(name, map, bindings)
            }
            Value::Mapping(map) if map.contains_key(HARMONIZER_TYPE) => self.harmonizer(name, map),
            Value::Mapping(map) => map
                .iter()
                .map(|(key, child)| {
                    let child = self.node(&child_path(name, &key_text(key)), child, bindings)?;
                    Ok((key.clone(), child))
                })
                .collect::<Result<Vec<_>>>()
                .map(Node::Map),
            Value::Tagged(tagged) => self.node(name, &tagged.value, bindings),
            scalar => Ok(Node::Literal(scalar.clone())),
        }
    }

    fn push(&mut self, name: &str, kind: ElementKind, bindings: &Bindings) -> ElementId {
        self.graph.push_element(Element {
            name: name.to_string(),
            kind,
            bindings: bindings.clone(),
        })
    }

    fn string(&mut self, name: &str, text: &str, bindings: &Bindings) -> Node {
        if let Some(path) = single_reference(text) {
            let kind = ElementKind::Reference {
                path: path.trim().to_string(),
            };
            return Node::Element(self.push(name, kind, bindings));
        }
        if has_macro(text) {
            return Node::Element(self.expression(name, text.trim(), bindings));
        }
        Node::Literal(Value::String(text.to_string()))
    }

    /// Placeholders that themselves contain placeholders get an inner
    /// expression (same name) computing the path.
    fn expression(&mut self, name: &str, text: &str, bindings: &Bindings) -> ElementId {
        let macros = extract_macros(text)
            .into_iter()
            .map(|span| {
                if has_macro(&span.inner) {
                    let path = self.expression(name, &span.inner, bindings);
                    Macro::Nested {
                        source: span.inner,
                        path,
                    }
                } else {
                    Macro::Path(span.inner)
                }
            })
            .collect();
        let kind = ElementKind::Expression {
            template: text.to_string(),
            macros,
        };
        self.push(name, kind, bindings)
    }

    fn field(&mut self, name: &str, map: &Mapping, key: &str, bindings: &Bindings) -> Result<Node> {
        let value = required(name, map, key)?;
        self.node(name, value, bindings)
    }

    fn optional_field(&mut self, name: &str, map: &Mapping, key: &str, bindings: &Bindings) -> Result<Option<Node>> {
        match map.get(key) {
            Some(value) if !value.is_null() => self.node(name, value, bindings).map(Some),
            _ => Ok(None),
        }
    }

    fn distribution(&mut self, name: &str, map: &Mapping, bindings: &Bindings) -> Result<Node> {
        let distribution_type: DistributionType = type_tag(name, map, DISTRIBUTION_TYPE)?
            .parse()
            .map_err(|reason: String| DescriptionError::config(name, reason))?;

        let kind = match distribution_type {
            DistributionType::Range => ElementKind::Range {
                start: self.field(name, map, "start", bindings)?,
                end: self.field(name, map, "end", bindings)?,
                seed: self.optional_field(name, map, "seed", bindings)?,
            },
            DistributionType::Set => ElementKind::Set {
                values: self.field(name, map, "values", bindings)?,
                index: self.optional_field(name, map, "index", bindings)?,
                seed: self.optional_field(name, map, "seed", bindings)?,
            },
            DistributionType::Folder => {
                let folder_key = if map.contains_key("value") { "value" } else { "folder" };
                let folder = map.get(folder_key).ok_or_else(|| {
                    DescriptionError::config(name, "\"value\" expected but not found")
                })?;
                ElementKind::Folder {
                    folder: self.node(name, folder, bindings)?,
                    suffix: self.field(name, map, "suffix", bindings)?,
                    index: self.optional_field(name, map, "index", bindings)?,
                    seed: self.optional_field(name, map, "seed", bindings)?,
                }
            }
            DistributionType::CameraFrustum => ElementKind::CameraFrustum {
                camera_parameters: self.field(name, map, "camera_parameters", bindings)?,
                distance_min: self.field(name, map, "distance_min", bindings)?,
                distance_max: self.field(name, map, "distance_max", bindings)?,
                screen_space_range: self.field(name, map, "screen_space_range", bindings)?,
            },
            DistributionType::Geometry => ElementKind::Geometry {
                file: self.field(name, map, "file", bindings)?,
            },
            DistributionType::Texture => ElementKind::Texture {
                operation: self.field(name, map, "operation", bindings)?,
            },
            DistributionType::Harmonized => {
                let overlay: Bindings = ["index", "count"]
                    .into_iter()
                    .filter_map(|key| map.get(key).map(|v| (key.to_string(), v.clone())))
                    .collect();
                let inner = merged(bindings, &overlay);
                let pitch = required(name, map, "pitch")?;
                ElementKind::Harmonized {
                    harmonizer_name: self.field(name, map, "harmonizer_name", &inner)?,
                    pitch: self.node(&child_path(name, "pitch"), pitch, &inner)?,
                    overlay,
                }
            }
        };
        Ok(Node::Element(self.push(name, kind, bindings)))
    }

    fn harmonizer(&mut self, name: &str, map: &Mapping) -> Result<Node> {
        let harmonizer_type: HarmonizerType = type_tag(name, map, HARMONIZER_TYPE)?
            .parse()
            .map_err(|reason: String| DescriptionError::config(name, reason))?;

        let kind = match harmonizer_type {
            HarmonizerType::Permutate => HarmonizerKind::Permutate,
            HarmonizerType::BinPack => {
                let bindings: Bindings = ["index", "count"]
                    .into_iter()
                    .filter_map(|key| map.get(key).map(|v| (key.to_string(), v.clone())))
                    .collect();
                HarmonizerKind::BinPack {
                    bin_size: self.field(name, map, "bin_size", &bindings)?,
                    bindings,
                }
            }
        };
        let id = self.graph.push_harmonizer(Harmonizer {
            name: name.to_string(),
            kind,
        });
        Ok(Node::Harmonizer(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(yaml: &str) -> Result<Graph> {
        build_graph(&serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_strings_classified() {
        let g = build("{a: '$[/b]', b: 'x $[a] y', c: plain, d: '$[a] + $[b]'}").unwrap();
        let kinds: Vec<_> = g.elements().iter().map(|e| (e.name.as_str(), e.kind.type_name())).collect();
        assert_eq!(
            kinds,
            vec![("/a", "reference"), ("/b", "expression"), ("/d", "expression")]
        );
        assert_eq!(g.context().get("c"), Some(&Node::Literal(Value::from("plain"))));
    }

    #[test]
    fn test_list_and_map_names() {
        let g = build("{objs: [{pos: '$[x]'}, 1]}").unwrap();
        assert_eq!(g.elements()[0].name, "/objs~0/pos");
    }

    #[test]
    fn test_nested_macro_gets_inner_expression() {
        let g = build("{v: '1 + $[/t/$[k]]'}").unwrap();
        assert_eq!(g.elements().len(), 2);
        let outer = &g.elements()[1];
        match &outer.kind {
            ElementKind::Expression { macros, .. } => {
                assert!(matches!(&macros[0], Macro::Nested { source, path } if source == "/t/$[k]" && path.index() == 0));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(g.elements()[0].name, "/v");
    }

    #[test]
    fn test_harmonized_overlay_and_pitch_name() {
        let g = build(
            "{h: {harmonizer_type: permutate}, x: {distribution_type: harmonized, harmonizer_name: h, pitch: '$[index]', index: 2}}",
        )
        .unwrap();
        let pitch = g.elements().iter().find(|e| e.name == "/x/pitch").unwrap();
        assert_eq!(pitch.bindings["index"], Value::from(2));
        assert!(g.elements().iter().any(|e| e.name == "/x" && e.kind.is_harmonized()));
        assert_eq!(g.harmonizer_by_name("h").map(|id| id.index()), Some(0));
    }

    #[test]
    fn test_missing_required_key() {
        let err = build("{r: {distribution_type: range, start: 0}}").unwrap_err();
        assert_eq!(err.to_string(), "configuration error in \"/r\": \"end\" expected but not found");
    }

    #[test]
    fn test_unknown_types() {
        assert!(build("{r: {distribution_type: gaussian}}").is_err());
        assert!(build("{h: {harmonizer_type: sort}}").is_err());
        assert!(build("{r: {distribution_type: 3}}").is_err());
    }

    #[test]
    fn test_bin_pack_requires_bin_size() {
        assert!(build("{p: {harmonizer_type: bin_pack}}").is_err());
        assert!(build("{p: {harmonizer_type: bin_pack, bin_size: [1, 1, 1]}}").is_ok());
    }
}
