//! Harmonized elements: contribute a pitch, wait for the harmonizer's answer.

use serde_yaml::Value;
use tracing::debug;

use super::Element;
use crate::description::{ready, Node, Outcome, Resolution, Resolver};
use crate::error::DescriptionError;
use crate::harmonizer::{HarmonizerId, HarmonizerStatus};
use crate::value::{float, kind_name, merged, Bindings};

/// Pitch token asking the geometry collaborator for the owner's local AABB.
pub const LOCAL_AABB: &str = "local_aabb";

fn aabb_value(aabb: [[f64; 3]; 2]) -> Value {
    Value::Sequence(
        aabb.iter()
            .map(|corner| Value::Sequence(corner.iter().map(|&x| float(x)).collect()))
            .collect(),
    )
}

impl<'d> Resolver<'d> {
    pub(super) fn resolve_harmonized(
        &mut self,
        element: &'d Element,
        harmonizer_name: &'d Node,
        pitch: &'d Node,
        overlay: &Bindings,
    ) -> Resolution {
        // harmonized values are undefined before the first real frame
        if self.is_init_frame {
            return Ok(Outcome::Ready(Value::Null));
        }

        let scope = merged(&merged(self.mapping, &element.bindings), overlay);
        let id = ready!(self.harmonizer_for(element, harmonizer_name, &scope)?);

        if self.state.harmonizer(id).status == HarmonizerStatus::Reflecting {
            return match self.state.harmonizer(id).reflect(&element.name) {
                Some(value) => Ok(Outcome::Ready(value.clone())),
                None => Err(DescriptionError::config(
                    &element.name,
                    format!(
                        "harmonizer \"{}\" already ran without a pitch from this attribute",
                        self.graph.harmonizer(id).name
                    ),
                )),
            };
        }

        let pitch = match pitch {
            Node::Literal(Value::String(token)) if token == LOCAL_AABB => {
                let source = self.pitch_source.ok_or_else(|| {
                    DescriptionError::config(&element.name, "local_aabb pitch needs a pitch source")
                })?;
                let aabb = source.local_aabb(&element.name).ok_or_else(|| {
                    DescriptionError::config(&element.name, "no local bounding box available")
                })?;
                aabb_value(aabb)
            }
            other => ready!(self.resolve_node(other, &scope)?),
        };

        let state = self.state.harmonizer_mut(id);
        if state.status == HarmonizerStatus::Unused {
            debug!(harmonizer = %self.graph.harmonizer(id).name, claimed_by = %element.name, "absorbing");
            state.status = HarmonizerStatus::Absorbing;
        }
        state.absorb(&element.name, pitch);
        Ok(Outcome::Pending)
    }

    /// The root-level harmonizer `harmonizer_name` resolves to.
    fn harmonizer_for(&mut self, element: &Element, harmonizer_name: &'d Node, scope: &Bindings) -> Resolution<HarmonizerId> {
        let name = ready!(self.resolve_node(harmonizer_name, scope)?);
        let Some(name) = name.as_str() else {
            return Err(DescriptionError::config(
                &element.name,
                format!("harmonizer_name must be a string, got {}", kind_name(&name)),
            ));
        };
        self.graph
            .harmonizer_by_name(name)
            .map(Outcome::Ready)
            .ok_or_else(|| {
                DescriptionError::config(&element.name, format!("no harmonizer named \"{name}\""))
            })
    }
}
