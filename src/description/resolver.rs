//! Lazy resolution over the graph arena
//!
//! A [`Resolver`] borrows the immutable [`Graph`] and the mutable
//! [`FrameState`] for the duration of one `resolve_scene` call. Elements are
//! resolved on demand and memoized per frame; an element re-entered while it
//! is still on the resolving stack is a cyclic reference.
//!
//! Every step returns [`Outcome`]: either a value or `Pending`, meaning some
//! harmonized attribute underneath is still waiting for its harmonizer.

use serde_yaml::{Mapping, Value};
use tracing::trace;

use super::graph::{Graph, Node};
use super::state::FrameState;
use crate::element::ElementId;
use crate::error::{DescriptionError, Result};
use crate::harmonizer::PitchSource;
use crate::reference::{absolute_path, segments};
use crate::value::{key_text, Bindings};

/// Result of resolving one node in one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T = Value> {
    Ready(T),
    /// Waiting on harmonization; retried on the next pass
    Pending,
}

impl<T> Outcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending)
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            Outcome::Pending => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ready(value) => Outcome::Ready(f(value)),
            Outcome::Pending => Outcome::Pending,
        }
    }
}

pub type Resolution<T = Value> = Result<Outcome<T>>;

/// Unwrap a ready value or return `Ok(Outcome::Pending)` from the enclosing function.
macro_rules! ready {
    ($outcome:expr) => {
        match $outcome {
            $crate::description::Outcome::Ready(value) => value,
            $crate::description::Outcome::Pending => {
                return Ok($crate::description::Outcome::Pending)
            }
        }
    };
}
pub(crate) use ready;

/// Position reached while walking a reference path.
#[derive(Debug, Clone)]
enum Cursor<'d> {
    Node(&'d Node),
    Value(Value),
}

pub struct Resolver<'d> {
    pub(crate) graph: &'d Graph,
    pub(crate) state: &'d mut FrameState,
    /// Per-frame `seed`/`num_frames`
    pub(crate) mapping: &'d Bindings,
    pub(crate) frame_seed: i64,
    pub(crate) is_init_frame: bool,
    pub(crate) pitch_source: Option<&'d dyn PitchSource>,
}

impl<'d> Resolver<'d> {
    /// Deep-resolve `node`. Containers resolve every child even after one is
    /// pending, so every harmonized attribute gets a chance to absorb.
    pub fn resolve_node(&mut self, node: &'d Node, scope: &Bindings) -> Resolution {
        match node {
            Node::Literal(value) => Ok(Outcome::Ready(value.clone())),
            Node::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                let mut pending = false;
                for item in items {
                    match self.resolve_node(item, scope)? {
                        Outcome::Ready(value) => out.push(value),
                        Outcome::Pending => pending = true,
                    }
                }
                Ok(if pending {
                    Outcome::Pending
                } else {
                    Outcome::Ready(Value::Sequence(out))
                })
            }
            Node::Map(entries) => {
                let mut out = Mapping::new();
                let mut pending = false;
                for (key, child) in entries {
                    if let Some(bound) = scope.get(&key_text(key)) {
                        out.insert(key.clone(), bound.clone());
                        continue;
                    }
                    match self.resolve_node(child, scope)? {
                        Outcome::Ready(value) => {
                            out.insert(key.clone(), value);
                        }
                        Outcome::Pending => pending = true,
                    }
                }
                Ok(if pending {
                    Outcome::Pending
                } else {
                    Outcome::Ready(Value::Mapping(out))
                })
            }
            Node::Element(id) => self.element_value(*id),
            Node::Harmonizer(id) => Ok(Outcome::Ready(
                self.graph.harmonizer(*id).representation(self.state.harmonizer(*id)),
            )),
        }
    }

    /// Memoized value of one element.
    pub fn element_value(&mut self, id: ElementId) -> Resolution {
        let graph = self.graph;
        let element = graph.element(id);

        if let Some(start) = self.state.resolving.iter().position(|r| *r == id) {
            let mut chain: Vec<String> = self.state.resolving[start..]
                .iter()
                .map(|r| graph.element(*r).name.clone())
                .collect();
            chain.push(element.name.clone());
            return Err(DescriptionError::CyclicReference {
                path: element.name.clone(),
                chain,
            });
        }
        if let Some(value) = self.state.value(id) {
            return Ok(Outcome::Ready(value.clone()));
        }

        self.state.resolving.push(id);
        let outcome = self.resolve_element(element);
        self.state.resolving.pop();

        let outcome = outcome?;
        if let Outcome::Ready(value) = &outcome {
            trace!(element = %element.name, kind = element.kind.type_name(), "resolved");
            let slot = &mut self.state.slots[id.0];
            slot.resolved = true;
            slot.value = value.clone();
        }
        Ok(outcome)
    }

    /// Resolve `reference` as seen from the attribute at `calling`.
    ///
    /// A name bound in `scope` wins outright. Otherwise the path is walked
    /// from the root; when only the final segment is missing the lookup is
    /// retried once for that segment at the root.
    pub fn lookup(&mut self, calling: &str, reference: &str, scope: &Bindings) -> Resolution {
        if let Some(bound) = scope.get(reference) {
            return Ok(Outcome::Ready(bound.clone()));
        }

        let absolute = absolute_path(calling, reference);
        if let Some(value) = ready!(self.walk(&absolute, reference, scope)?) {
            return Ok(Outcome::Ready(value));
        }

        let last = absolute.rsplit('/').next().unwrap_or_default();
        let fallback = format!("/{last}");
        if fallback != absolute {
            if let Some(value) = ready!(self.walk(&fallback, reference, scope)?) {
                return Ok(Outcome::Ready(value));
            }
        }
        Err(DescriptionError::missing(reference.trim()))
    }

    /// `Ready(None)` when only the final key is absent.
    fn walk(&mut self, absolute: &str, requested: &str, scope: &Bindings) -> Resolution<Option<Value>> {
        let graph = self.graph;
        let path = segments(absolute, requested)?;
        let last = path.len().saturating_sub(1);

        let mut cursor = Cursor::Node(&graph.context);
        for (position, segment) in path.iter().enumerate() {
            cursor = match ready!(self.child(cursor, &segment.key)?) {
                Some(child) => child,
                None if position == last => return Ok(Outcome::Ready(None)),
                None => return Err(DescriptionError::missing(requested.trim())),
            };
            for &index in &segment.indices {
                cursor = match ready!(self.item(cursor, index)?) {
                    Some(item) => item,
                    None => return Err(DescriptionError::missing(requested.trim())),
                };
            }
        }

        let value = match cursor {
            Cursor::Node(node) => ready!(self.resolve_node(node, scope)?),
            Cursor::Value(value) => value,
        };
        Ok(Outcome::Ready(Some(value)))
    }

    /// Turn an element or harmonizer under the cursor into its value so it can be descended into.
    fn materialize(&mut self, node: &'d Node) -> Resolution {
        match node {
            Node::Element(id) => self.element_value(*id),
            other => self.resolve_node(other, &Bindings::new()),
        }
    }

    fn child(&mut self, cursor: Cursor<'d>, key: &str) -> Resolution<Option<Cursor<'d>>> {
        let value = match cursor {
            Cursor::Node(node @ Node::Map(_)) => return Ok(Outcome::Ready(node.get(key).map(Cursor::Node))),
            Cursor::Node(Node::List(_)) => return Ok(Outcome::Ready(None)),
            Cursor::Node(node) => ready!(self.materialize(node)?),
            Cursor::Value(value) => value,
        };
        let found = value
            .as_mapping()
            .and_then(|map| map.iter().find(|(k, _)| key_text(k) == key))
            .map(|(_, v)| Cursor::Value(v.clone()));
        Ok(Outcome::Ready(found))
    }

    fn item(&mut self, cursor: Cursor<'d>, index: usize) -> Resolution<Option<Cursor<'d>>> {
        let value = match cursor {
            Cursor::Node(Node::List(items)) => return Ok(Outcome::Ready(items.get(index).map(Cursor::Node))),
            Cursor::Node(Node::Map(_)) => return Ok(Outcome::Ready(None)),
            Cursor::Node(node) => ready!(self.materialize(node)?),
            Cursor::Value(value) => value,
        };
        let found = value
            .as_sequence()
            .and_then(|items| items.get(index))
            .map(|v| Cursor::Value(v.clone()));
        Ok(Outcome::Ready(found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::builder::build_graph;
    use pretty_assertions::assert_eq;

    fn graph(yaml: &str) -> Graph {
        build_graph(&serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    fn lookup(graph: &Graph, calling: &str, reference: &str) -> Resolution {
        let mut state = FrameState::new(graph);
        let mapping = Bindings::new();
        let mut resolver = Resolver {
            graph,
            state: &mut state,
            mapping: &mapping,
            frame_seed: 0,
            is_init_frame: false,
            pitch_source: None,
        };
        resolver.lookup(calling, reference, &mapping)
    }

    #[test]
    fn test_absolute_and_relative_lookup() {
        let g = graph("{a: {b: [10, 20]}}");
        assert_eq!(lookup(&g, "/x", "/a/b~1").unwrap(), Outcome::Ready(Value::from(20)));
        assert_eq!(lookup(&g, "/a/x", "b~0").unwrap(), Outcome::Ready(Value::from(10)));
    }

    #[test]
    fn test_root_fallback_for_final_segment() {
        let g = graph("{shared: 5, group: {inner: {x: 1}}}");
        assert_eq!(
            lookup(&g, "/group/inner/x", "shared").unwrap(),
            Outcome::Ready(Value::from(5))
        );
    }

    #[test]
    fn test_missing_names_requested_path() {
        let g = graph("{a: {b: 1}}");
        let err = lookup(&g, "/a/b", "../nope/deeper").unwrap_err();
        assert!(matches!(err, DescriptionError::MissingReference { ref path } if path == "../nope/deeper"));
        let err = lookup(&g, "/a/b", "/absent").unwrap_err();
        assert!(matches!(err, DescriptionError::MissingReference { ref path } if path == "/absent"));
    }

    #[test]
    fn test_chained_indices() {
        let g = graph("{grid: [[1, 2, 3], [4, 5, 6]]}");
        assert_eq!(lookup(&g, "/x", "/grid~1~2").unwrap(), Outcome::Ready(Value::from(6)));
        assert!(lookup(&g, "/x", "/grid~2~0").is_err());
    }

    #[test]
    fn test_descends_through_resolved_elements() {
        let g = graph("{src: {k: [7, 8]}, alias: '$[/src]', z: 0}");
        assert_eq!(lookup(&g, "/z", "/alias/k~1").unwrap(), Outcome::Ready(Value::from(8)));
    }

    #[test]
    fn test_self_reference_is_cyclic() {
        let g = graph("{a: '$[b]', b: '$[a]'}");
        let err = lookup(&g, "/x", "/a").unwrap_err();
        match err {
            DescriptionError::CyclicReference { path, chain } => {
                assert_eq!(path, "/a");
                assert_eq!(chain, vec!["/a", "/b", "/a"]);
            }
            other => panic!("unexpected {other}"),
        }
    }
}
