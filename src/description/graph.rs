//! Arena holding the built attribute graph.

use serde_yaml::Value;

use crate::element::{Element, ElementId};
use crate::harmonizer::{Harmonizer, HarmonizerId};
use crate::value::key_text;

/// One position in the attribute tree template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Value),
    List(Vec<Node>),
    /// Mapping entries in document order
    Map(Vec<(Value, Node)>),
    Element(ElementId),
    Harmonizer(HarmonizerId),
}

impl Node {
    /// Child of a `Map` node by key text.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(entries) => entries
                .iter()
                .find(|(k, _)| key_text(k) == key)
                .map(|(_, node)| node),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Node::Literal(value) => Some(value),
            _ => None,
        }
    }
}

/// Immutable after construction; per-frame state lives in `FrameState`.
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) context: Node,
    pub(crate) elements: Vec<Element>,
    pub(crate) harmonizers: Vec<Harmonizer>,
}

impl Graph {
    pub fn context(&self) -> &Node {
        &self.context
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    pub fn harmonizers(&self) -> &[Harmonizer] {
        &self.harmonizers
    }

    pub fn harmonizer(&self, id: HarmonizerId) -> &Harmonizer {
        &self.harmonizers[id.0]
    }

    /// Harmonizer declared under root-level key `name`.
    pub fn harmonizer_by_name(&self, name: &str) -> Option<HarmonizerId> {
        match self.context.get(name)? {
            Node::Harmonizer(id) => Some(*id),
            _ => None,
        }
    }

    pub(crate) fn push_element(&mut self, element: Element) -> ElementId {
        self.elements.push(element);
        ElementId(self.elements.len() - 1)
    }

    pub(crate) fn push_harmonizer(&mut self, harmonizer: Harmonizer) -> HarmonizerId {
        self.harmonizers.push(harmonizer);
        HarmonizerId(self.harmonizers.len() - 1)
    }
}
