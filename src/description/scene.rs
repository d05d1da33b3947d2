//! Fixed-point driver: resolve, fire absorbing harmonizers, repeat.

use std::collections::HashMap;

use serde::Serialize;
use serde_yaml::Value;
use tracing::debug;

use super::graph::Node;
use super::resolver::{Outcome, Resolver};
use crate::error::{DescriptionError, Result};
use crate::harmonizer::{bin_pack, permutate, HarmonizerId, HarmonizerKind, HarmonizerStatus};
use crate::value::{merged, Bindings};

/// One frame's produced description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedScene {
    pub value: Value,
    /// Fixed-point passes it took
    pub passes: usize,
}

impl<'d> Resolver<'d> {
    /// Resolve the whole context until nothing is pending.
    ///
    /// Each pass can only move harmonizers forward (absorbing to
    /// reflecting), so a pass that leaves the tree pending without firing
    /// any harmonizer would repeat forever; that is reported instead.
    pub fn resolve_scene(&mut self) -> Result<ResolvedScene> {
        let graph = self.graph;
        let mut passes = 0;
        loop {
            passes += 1;
            let outcome = self.resolve_node(&graph.context, self.mapping)?;
            let fired = self.fire_harmonizers()?;
            debug!(pass = passes, fired, pending = outcome.is_pending(), "fixed-point pass");

            match outcome {
                Outcome::Ready(value) => return Ok(ResolvedScene { value, passes }),
                Outcome::Pending if fired == 0 => {
                    return Err(DescriptionError::HarmonizationStalled {
                        pending: self.state.unresolved_harmonized(graph),
                    })
                }
                Outcome::Pending => {}
            }
        }
    }

    /// Harmonize every absorbing harmonizer and switch it to reflecting.
    fn fire_harmonizers(&mut self) -> Result<usize> {
        let mut fired = 0;
        for index in 0..self.graph.harmonizers.len() {
            let id = HarmonizerId(index);
            if self.state.harmonizer(id).status != HarmonizerStatus::Absorbing {
                continue;
            }
            if !self.is_init_frame {
                self.harmonize(id)?;
            }
            self.state.harmonizer_mut(id).status = HarmonizerStatus::Reflecting;
            fired += 1;
        }
        Ok(fired)
    }

    fn harmonize(&mut self, id: HarmonizerId) -> Result<()> {
        let graph = self.graph;
        let harmonizer = graph.harmonizer(id);
        debug!(
            harmonizer = %harmonizer.name,
            kind = %harmonizer.kind.harmonizer_type(),
            inputs = self.state.harmonizer(id).input.len(),
            "harmonizing"
        );

        let output = match &harmonizer.kind {
            HarmonizerKind::Permutate => {
                permutate::harmonize(&harmonizer.name, self.frame_seed, &self.state.harmonizer(id).input)
            }
            HarmonizerKind::BinPack { bin_size, bindings } => {
                let value = self.resolve_bin_size(&harmonizer.name, bin_size, bindings)?;
                let bin = bin_pack::bin_size(&harmonizer.name, &value)?;
                self.state.harmonizer_mut(id).resolved_bin_size = Some(value);
                bin_pack::harmonize(&harmonizer.name, bin, &self.state.harmonizer(id).input)?
            }
        };
        self.state.harmonizer_mut(id).output = output.into_iter().collect::<HashMap<_, _>>();
        Ok(())
    }

    fn resolve_bin_size(&mut self, name: &str, node: &'d Node, bindings: &Bindings) -> Result<Value> {
        let scope = merged(self.mapping, bindings);
        match self.resolve_node(node, &scope)? {
            Outcome::Ready(value) => Ok(value),
            Outcome::Pending => Err(DescriptionError::config(
                name,
                "bin_size cannot depend on a harmonized attribute",
            )),
        }
    }
}
