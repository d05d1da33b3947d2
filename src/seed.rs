//! Deterministic per-attribute randomness.
//!
//! Each sampling attribute gets its own generator derived from its path and
//! the frame (or user) seed, so results do not depend on how many other
//! attributes were sampled before it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

/// Generator for the attribute at `path`.
///
/// `user_seed` (the attribute's own `seed`) replaces the frame seed when set.
pub fn attribute_rng(path: &str, frame_seed: i64, user_seed: Option<i64>) -> StdRng {
    let digest = Sha256::digest(path.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let base = u64::from_be_bytes(head);
    let offset = user_seed.unwrap_or(frame_seed);
    StdRng::seed_from_u64(base.wrapping_add(offset as u64))
}

/// Uniform in `[a, b)`.
pub fn rand_range<R: Rng>(rng: &mut R, a: f64, b: f64) -> f64 {
    a + (b - a) * rng.gen::<f64>()
}

/// Distance sample between `a` and `b` with density proportional to 1/d².
///
/// Equivalent to sampling uniformly in inverse distance, which spreads
/// objects evenly in screen space.
pub fn random_reciprocal<R: Rng>(rng: &mut R, a: f64, b: f64) -> f64 {
    a * b / (a + (b - a) * rng.gen::<f64>())
}
