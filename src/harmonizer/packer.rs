//! Single-bin 3D packing heuristic
//!
//! First-fit decreasing: items are placed largest volume first. The first item
//! goes to the origin; every later item is tried at the pivots formed by the
//! far faces of already placed items (all x faces, then y, then z), and at
//! each pivot in each of the six axis-aligned rotations. The first
//! pivot/rotation that stays inside the bin without overlapping anything wins.

use std::cmp::Ordering;

/// Axis permutation applied to an item's `[w, h, d]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// `[w, h, d]`
    Whd,
    /// `[h, w, d]`
    Hwd,
    /// `[h, d, w]`
    Hdw,
    /// `[d, h, w]`
    Dhw,
    /// `[d, w, h]`
    Dwh,
    /// `[w, d, h]`
    Wdh,
}

impl Rotation {
    pub const ALL: [Rotation; 6] = [
        Rotation::Whd,
        Rotation::Hwd,
        Rotation::Hdw,
        Rotation::Dhw,
        Rotation::Dwh,
        Rotation::Wdh,
    ];

    pub fn index(self) -> usize {
        match self {
            Rotation::Whd => 0,
            Rotation::Hwd => 1,
            Rotation::Hdw => 2,
            Rotation::Dhw => 3,
            Rotation::Dwh => 4,
            Rotation::Wdh => 5,
        }
    }

    pub fn apply(self, [w, h, d]: [f64; 3]) -> [f64; 3] {
        match self {
            Rotation::Whd => [w, h, d],
            Rotation::Hwd => [h, w, d],
            Rotation::Hdw => [h, d, w],
            Rotation::Dhw => [d, h, w],
            Rotation::Dwh => [d, w, h],
            Rotation::Wdh => [w, d, h],
        }
    }
}

/// Where a fitted item ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Minimum corner inside the bin
    pub position: [f64; 3],
    pub rotation: Rotation,
    /// Extent after rotation
    pub dimension: [f64; 3],
}

impl Placement {
    /// Overlap test on the xy, yz and xz projections. Touching faces do not overlap.
    pub fn intersects(&self, other: &Placement) -> bool {
        self.overlaps_on(other, 0, 1) && self.overlaps_on(other, 1, 2) && self.overlaps_on(other, 0, 2)
    }

    fn overlaps_on(&self, other: &Placement, x: usize, y: usize) -> bool {
        let center = |p: &Placement, axis: usize| p.position[axis] + p.dimension[axis] / 2.0;
        let ix = (center(self, x) - center(other, x)).abs();
        let iy = (center(self, y) - center(other, y)).abs();
        ix < (self.dimension[x] + other.dimension[x]) / 2.0
            && iy < (self.dimension[y] + other.dimension[y]) / 2.0
    }

    fn fits_in(&self, bin: [f64; 3]) -> bool {
        (0..3).all(|axis| self.position[axis] + self.dimension[axis] <= bin[axis])
    }
}

fn volume([w, h, d]: [f64; 3]) -> f64 {
    w * h * d
}

fn try_place(bin: [f64; 3], item: [f64; 3], pivot: [f64; 3], placed: &[Placement]) -> Option<Placement> {
    Rotation::ALL.into_iter().find_map(|rotation| {
        let candidate = Placement {
            position: pivot,
            rotation,
            dimension: rotation.apply(item),
        };
        (candidate.fits_in(bin) && !placed.iter().any(|p| p.intersects(&candidate)))
            .then_some(candidate)
    })
}

/// Pack `items` (`[w, h, d]` each) into one bin of size `bin`.
///
/// Returns one entry per item in input order; `None` means the item did not fit.
pub fn pack(bin: [f64; 3], items: &[[f64; 3]]) -> Vec<Option<Placement>> {
    let mut order: Vec<usize> = (0..items.len()).collect();
    // stable, so equal volumes keep input order
    order.sort_by(|&a, &b| {
        volume(items[b])
            .partial_cmp(&volume(items[a]))
            .unwrap_or(Ordering::Equal)
    });

    let mut placements = vec![None; items.len()];
    let mut placed: Vec<Placement> = Vec::new();

    for index in order {
        let item = items[index];
        let found = if placed.is_empty() {
            try_place(bin, item, [0.0; 3], &placed)
        } else {
            (0..3).find_map(|axis| {
                placed.iter().find_map(|anchor| {
                    let mut pivot = anchor.position;
                    pivot[axis] += anchor.dimension[axis];
                    try_place(bin, item, pivot, &placed)
                })
            })
        };
        if let Some(placement) = found {
            placed.push(placement);
            placements[index] = Some(placement);
        }
    }
    placements
}
