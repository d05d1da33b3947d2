//! BinPack: place every contributor's bounding box inside one shared bin.
//!
//! Each pitch is a local AABB `[[min_x, min_y, min_z], [max_x, max_y, max_z]]`.
//! The output for a contributor is a 4x4 row-vector transform (translation
//! in the last row) that moves its box to the packed location, with the bin
//! centred on the origin. Items that do not fit are sent far away instead of
//! failing the frame.

use serde_yaml::Value;
use tracing::{debug, warn};

use super::packer::{pack, Placement, Rotation};
use crate::error::{DescriptionError, Result};
use crate::value::{as_f64, float};

/// Translation applied to items that did not fit.
pub const UNFITTED_OFFSET: f64 = 10000.0;

pub type Mat3 = [[f64; 3]; 3];
pub type Mat4 = [[f64; 4]; 4];

const IDENTITY3: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
const ROT_X: Mat3 = [[1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]];
const ROT_Y: Mat3 = [[0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]];
const ROT_Z: Mat3 = [[0.0, 1.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];

fn mul3(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn mul4(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [[0.0; 4]; 4];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn translation(t: [f64; 3]) -> Mat4 {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [t[0], t[1], t[2], 1.0],
    ]
}

fn rotation4(r: &Mat3) -> Mat4 {
    let mut out = translation([0.0; 3]);
    for i in 0..3 {
        out[i][..3].copy_from_slice(&r[i]);
    }
    out
}

/// Rotation taking an item's `[w, h, d]` extent onto the packer's rotated extent.
pub fn rotation_matrix(rotation: Rotation) -> Mat3 {
    match rotation {
        Rotation::Whd => IDENTITY3,
        Rotation::Hwd => ROT_Z,
        Rotation::Hdw => mul3(&ROT_Z, &ROT_X),
        Rotation::Dhw => ROT_Y,
        Rotation::Dwh => mul3(&ROT_Z, &ROT_Y),
        Rotation::Wdh => ROT_X,
    }
}

/// Transform for one packed item.
pub fn placement_transform(center: [f64; 3], placement: &Placement, bin: [f64; 3]) -> Mat4 {
    let to_origin = translation([-center[0], -center[1], -center[2]]);
    let rotate = rotation4(&rotation_matrix(placement.rotation));
    let offset: [f64; 3] = std::array::from_fn(|axis| {
        placement.position[axis] + placement.dimension[axis] / 2.0 - bin[axis] / 2.0
    });
    mul4(&mul4(&to_origin, &rotate), &translation(offset))
}

pub fn unfitted_transform() -> Mat4 {
    translation([UNFITTED_OFFSET, 0.0, 0.0])
}

pub fn matrix_value(m: &Mat4) -> Value {
    Value::Sequence(
        m.iter()
            .map(|row| Value::Sequence(row.iter().map(|&x| float(x)).collect()))
            .collect(),
    )
}

fn vec3(value: &Value) -> Option<[f64; 3]> {
    match value.as_sequence()?.as_slice() {
        [x, y, z] => Some([as_f64(x)?, as_f64(y)?, as_f64(z)?]),
        _ => None,
    }
}

/// Validate a resolved `bin_size`.
pub fn bin_size(name: &str, value: &Value) -> Result<[f64; 3]> {
    match vec3(value) {
        Some(size) if size.iter().all(|s| s.is_finite() && *s >= 0.0) => Ok(size),
        _ => Err(DescriptionError::config(
            name,
            format!("bin_size must be three non-negative numbers, got {value:?}"),
        )),
    }
}

/// `(center, [w, h, d])` of an AABB pitch.
fn aabb(element: &str, pitch: &Value) -> Result<([f64; 3], [f64; 3])> {
    let corners = pitch
        .as_sequence()
        .filter(|corners| corners.len() == 2)
        .and_then(|corners| Some((vec3(&corners[0])?, vec3(&corners[1])?)));
    let Some((min, max)) = corners else {
        return Err(DescriptionError::config(
            element,
            "bin_pack pitch must be [[min_x, min_y, min_z], [max_x, max_y, max_z]]",
        ));
    };
    let dims: [f64; 3] = std::array::from_fn(|axis| max[axis] - min[axis]);
    if dims.iter().any(|d| !d.is_finite() || *d < 0.0) {
        return Err(DescriptionError::config(
            element,
            "bin_pack pitch has a max corner below its min corner",
        ));
    }
    let center = std::array::from_fn(|axis| (min[axis] + max[axis]) / 2.0);
    Ok((center, dims))
}

/// Pack all absorbed boxes and produce one transform per contributor.
pub fn harmonize(name: &str, bin: [f64; 3], input: &[(String, Value)]) -> Result<Vec<(String, Value)>> {
    let boxes = input
        .iter()
        .map(|(element, pitch)| aabb(element, pitch))
        .collect::<Result<Vec<_>>>()?;
    let dims: Vec<[f64; 3]> = boxes.iter().map(|(_, d)| *d).collect();
    let placements = pack(bin, &dims);

    let fitted = placements.iter().filter(|p| p.is_some()).count();
    debug!(harmonizer = name, fitted, total = input.len(), "bin packed");

    Ok(input
        .iter()
        .zip(boxes)
        .zip(placements)
        .map(|(((element, _), (center, _)), placement)| {
            let transform = match placement {
                Some(placement) => placement_transform(center, &placement, bin),
                None => {
                    warn!(harmonizer = name, element = %element, "item does not fit in bin; moved off-scene");
                    unfitted_transform()
                }
            };
            (element.clone(), matrix_value(&transform))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: &Mat4, p: [f64; 3]) -> [f64; 3] {
        std::array::from_fn(|j| p[0] * m[0][j] + p[1] * m[1][j] + p[2] * m[2][j] + m[3][j])
    }

    fn pitch(min: [f64; 3], max: [f64; 3]) -> Value {
        let v = |p: [f64; 3]| Value::Sequence(p.iter().map(|&x| float(x)).collect());
        Value::Sequence(vec![v(min), v(max)])
    }

    fn read(m: &Value) -> Mat4 {
        let mut out = [[0.0; 4]; 4];
        for (i, row) in m.as_sequence().unwrap().iter().enumerate() {
            for (j, x) in row.as_sequence().unwrap().iter().enumerate() {
                out[i][j] = x.as_f64().unwrap();
            }
        }
        out
    }

    #[test]
    fn test_rotations_map_extents() {
        let extent = [1.0, 2.0, 3.0];
        for rotation in Rotation::ALL {
            let r = rotation_matrix(rotation);
            let mapped: [f64; 3] = std::array::from_fn(|j| (0..3).map(|i| extent[i] * r[i][j]).sum::<f64>().abs());
            assert_eq!(mapped, rotation.apply(extent), "{rotation:?}");
        }
    }

    #[test]
    fn test_corners_land_inside_bin() {
        let bin = [4.0, 4.0, 4.0];
        let input = vec![
            ("/a".to_string(), pitch([-1.0, -0.5, 0.0], [1.0, 0.5, 3.0])),
            ("/b".to_string(), pitch([0.0, 0.0, 0.0], [1.0, 1.0, 1.0])),
        ];
        let out = harmonize("/packer", bin, &input).unwrap();
        for ((_, p), (_, m)) in input.iter().zip(&out) {
            let m = read(m);
            let seq = p.as_sequence().unwrap();
            let min = vec3(&seq[0]).unwrap();
            let max = vec3(&seq[1]).unwrap();
            for corner in [min, max] {
                let q = apply(&m, corner);
                for axis in 0..3 {
                    assert!(q[axis].abs() <= bin[axis] / 2.0 + 1e-9, "{q:?}");
                }
            }
        }
    }

    #[test]
    fn test_unfitted_goes_off_scene() {
        let input = vec![("/big".to_string(), pitch([0.0; 3], [5.0, 5.0, 5.0]))];
        let out = harmonize("/packer", [1.0, 1.0, 1.0], &input).unwrap();
        assert_eq!(read(&out[0].1)[3][0], UNFITTED_OFFSET);
    }

    #[test]
    fn test_malformed_pitch() {
        let input = vec![("/x".to_string(), Value::from("local_aabb"))];
        let err = harmonize("/packer", [1.0, 1.0, 1.0], &input).unwrap_err();
        assert_eq!(err.path(), Some("/x"));
    }

    #[test]
    fn test_bin_size_validation() {
        let ok: Value = serde_yaml::from_str("[1, 2.5, 3]").unwrap();
        assert_eq!(bin_size("/p", &ok).unwrap(), [1.0, 2.5, 3.0]);
        let bad: Value = serde_yaml::from_str("[1, 2]").unwrap();
        assert!(bin_size("/p", &bad).is_err());
    }
}
