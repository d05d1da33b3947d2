//! Sampling elements: range, set, camera frustum, and the geometry/texture placeholders.

use rand::rngs::StdRng;
use rand::Rng;
use serde_yaml::Value;

use super::Element;
use crate::description::{ready, Node, Outcome, Resolution, Resolver};
use crate::error::DescriptionError;
use crate::seed::{attribute_rng, rand_range, random_reciprocal};
use crate::value::{as_f64, as_index, float, kind_name, literal_text, Bindings};

impl<'d> Resolver<'d> {
    /// Generator for `element`, seeded by its own `seed` attribute when present.
    pub(super) fn element_rng(
        &mut self,
        element: &Element,
        seed: Option<&'d Node>,
        scope: &Bindings,
    ) -> Resolution<StdRng> {
        let user_seed = match seed {
            None => None,
            Some(node) => match ready!(self.resolve_node(node, scope)?) {
                Value::Null => None,
                value @ Value::Number(_) => as_index(&value),
                other => {
                    return Err(DescriptionError::config(
                        &element.name,
                        format!("seed must be an integer, got {}", kind_name(&other)),
                    ))
                }
            },
        };
        Ok(Outcome::Ready(attribute_rng(&element.name, self.frame_seed, user_seed)))
    }

    fn number(&mut self, element: &Element, node: &'d Node, what: &str, scope: &Bindings) -> Resolution<f64> {
        let value = ready!(self.resolve_node(node, scope)?);
        as_f64(&value).map(Outcome::Ready).ok_or_else(|| {
            DescriptionError::config(
                &element.name,
                format!("{what} must be a number, got {}", kind_name(&value)),
            )
        })
    }

    /// Uniform sample in `[start, end)`, elementwise for lists.
    pub(super) fn resolve_range(
        &mut self,
        element: &Element,
        start: &'d Node,
        end: &'d Node,
        seed: Option<&'d Node>,
        scope: &Bindings,
    ) -> Resolution {
        let start = ready!(self.resolve_node(start, scope)?);
        let end = ready!(self.resolve_node(end, scope)?);
        let mut rng = ready!(self.element_rng(element, seed, scope)?);

        let value = match (&start, &end) {
            (Value::Sequence(low), Value::Sequence(high)) => {
                if low.len() != high.len() {
                    return Err(DescriptionError::config(
                        &element.name,
                        format!(
                            "mismatching start/end dimension in range ({} vs {})",
                            low.len(),
                            high.len()
                        ),
                    ));
                }
                let bounds = low
                    .iter()
                    .zip(high)
                    .map(|(a, b)| Some((as_f64(a)?, as_f64(b)?)))
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| {
                        DescriptionError::config(&element.name, "range bounds must be numbers")
                    })?;
                Value::Sequence(
                    bounds
                        .into_iter()
                        .map(|(a, b)| float(rand_range(&mut rng, a, b)))
                        .collect(),
                )
            }
            _ => match (as_f64(&start), as_f64(&end)) {
                (Some(a), Some(b)) => float(rand_range(&mut rng, a, b)),
                _ => {
                    return Err(DescriptionError::config(
                        &element.name,
                        format!(
                            "invalid types for start ({}) and/or end ({}) in range",
                            kind_name(&start),
                            kind_name(&end)
                        ),
                    ))
                }
            },
        };
        Ok(Outcome::Ready(value))
    }

    /// One of `values`: by index when given, otherwise seeded choice.
    /// The setup frame sees the whole list.
    pub(super) fn resolve_set(
        &mut self,
        element: &Element,
        values: &'d Node,
        index: Option<&'d Node>,
        seed: Option<&'d Node>,
        scope: &Bindings,
    ) -> Resolution {
        let values = ready!(self.resolve_node(values, scope)?);
        let mut items = match values {
            Value::Sequence(items) => items,
            other => {
                return Err(DescriptionError::config(
                    &element.name,
                    format!("set values must be a list, got {}", kind_name(&other)),
                ))
            }
        };
        if self.is_init_frame {
            return Ok(Outcome::Ready(Value::Sequence(items)));
        }
        if items.is_empty() {
            return Err(DescriptionError::config(&element.name, "set values are empty"));
        }

        let position = match index {
            Some(node) => {
                let value = ready!(self.resolve_node(node, scope)?);
                let index = as_index(&value).ok_or_else(|| {
                    DescriptionError::config(&element.name, "set index must be an integer")
                })?;
                index.rem_euclid(items.len() as i64) as usize
            }
            None => {
                let mut rng = ready!(self.element_rng(element, seed, scope)?);
                rng.gen_range(0..items.len())
            }
        };
        Ok(Outcome::Ready(items.swap_remove(position)))
    }

    /// Point in a camera's view frustum: `[x, y, -distance]` in camera space.
    pub(super) fn resolve_camera_frustum(
        &mut self,
        element: &Element,
        [parameters, distance_min, distance_max, screen_space_range]: [&'d Node; 4],
        scope: &Bindings,
    ) -> Resolution {
        let parameters = ready!(self.resolve_node(parameters, scope)?);
        let distance_min = ready!(self.number(element, distance_min, "distance_min", scope)?);
        let distance_max = ready!(self.number(element, distance_max, "distance_max", scope)?);
        let screen_space_range = ready!(self.number(element, screen_space_range, "screen_space_range", scope)?);

        let parameter = |key: &str| {
            parameters.get(key).and_then(as_f64).ok_or_else(|| {
                DescriptionError::config(
                    &element.name,
                    format!("camera_parameters.{key} must be a number"),
                )
            })
        };
        let focal_length = parameter("focal_length")?;
        let horizontal_aperture = parameter("horizontal_aperture")?;
        let screen_width = parameter("screen_width")?;
        let screen_height = parameter("screen_height")?;
        if horizontal_aperture == 0.0 || screen_height == 0.0 {
            return Err(DescriptionError::config(
                &element.name,
                "horizontal_aperture and screen_height must be non-zero",
            ));
        }

        let pinhole_ratio = 2.0 * focal_length / horizontal_aperture * screen_width / screen_height;
        let aspect_ratio = screen_width / screen_height;

        let mut rng = attribute_rng(&element.name, self.frame_seed, None);
        let distance = random_reciprocal(&mut rng, distance_min, distance_max);
        let x = screen_space_range * rand_range(&mut rng, -1.0, 1.0) * distance;
        let y = screen_space_range * rand_range(&mut rng, -1.0, 1.0) * distance;

        let point = [x / pinhole_ratio * aspect_ratio, y / pinhole_ratio, -distance];
        Ok(Outcome::Ready(Value::Sequence(point.into_iter().map(float).collect())))
    }

    pub(super) fn resolve_texture(&mut self, _element: &Element, operation: &'d Node, scope: &Bindings) -> Resolution {
        let operation = ready!(self.resolve_node(operation, scope)?);
        Ok(Outcome::Ready(Value::String(format!(
            "operation:{}",
            literal_text(&operation)
        ))))
    }
}
