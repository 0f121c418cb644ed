//! Degraded-mode vectors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::vector::similarity::normalize;

/// Unit-length pseudo-random vector seeded by a text digest.
///
/// The same digest always yields the same vector, so a degraded document
/// still compares equal to itself across calls.
pub fn degraded_vector(digest: [u8; 32], dimension: usize) -> Vec<f32> {
    let mut rng = StdRng::from_seed(digest);
    let mut vector: Vec<f32> = (0..dimension)
        .map(|_| rng.random_range(-1.0f32..1.0))
        .collect();
    normalize(&mut vector);
    vector
}
