//! Per-frame resolution state, kept apart from the immutable graph.

use std::collections::HashMap;

use serde_yaml::Value;

use super::graph::Graph;
use crate::element::ElementId;
use crate::harmonizer::{HarmonizerId, HarmonizerState};

#[derive(Debug, Clone, Default)]
pub(crate) struct ElementSlot {
    pub resolved: bool,
    pub value: Value,
}

#[derive(Debug, Default)]
pub struct FrameState {
    pub(crate) slots: Vec<ElementSlot>,
    pub(crate) harmonizers: Vec<HarmonizerState>,
    /// Elements currently being resolved, outermost first
    pub(crate) resolving: Vec<ElementId>,
    /// Folder listings keyed by `(folder, suffix)`; survives `reset`
    pub(crate) folders: HashMap<(String, String), Vec<String>>,
}

impl FrameState {
    pub fn new(graph: &Graph) -> Self {
        FrameState {
            slots: vec![ElementSlot::default(); graph.elements.len()],
            harmonizers: vec![HarmonizerState::default(); graph.harmonizers.len()],
            resolving: Vec::new(),
            folders: HashMap::new(),
        }
    }

    /// Forget every resolved value and harmonizer exchange.
    pub fn reset(&mut self) {
        self.slots.fill(ElementSlot::default());
        self.harmonizers.iter_mut().for_each(HarmonizerState::reset);
        self.resolving.clear();
    }

    pub fn is_resolved(&self, id: ElementId) -> bool {
        self.slots[id.0].resolved
    }

    /// Cached value of a resolved element.
    pub fn value(&self, id: ElementId) -> Option<&Value> {
        let slot = &self.slots[id.0];
        slot.resolved.then_some(&slot.value)
    }

    pub fn harmonizer(&self, id: HarmonizerId) -> &HarmonizerState {
        &self.harmonizers[id.0]
    }

    pub(crate) fn harmonizer_mut(&mut self, id: HarmonizerId) -> &mut HarmonizerState {
        &mut self.harmonizers[id.0]
    }

    /// Names of harmonized elements that have not produced a value yet.
    pub fn unresolved_harmonized(&self, graph: &Graph) -> Vec<String> {
        graph
            .elements
            .iter()
            .zip(&self.slots)
            .filter(|(element, slot)| element.kind.is_harmonized() && !slot.resolved)
            .map(|(element, _)| element.name.clone())
            .collect()
    }
}
