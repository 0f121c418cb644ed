//! Vector storage and vector-space algorithms.
//!
//! Index vectors live in a contiguous [`VectorArena`]. On top of it sit
//! the similarity kernels used by every ranking path, k-means
//! clustering, and exhaustive near-duplicate detection.

mod arena;
mod clustering;
mod duplicates;
pub mod similarity;
mod types;

pub use arena::VectorArena;
pub use clustering::{
    ClusteringError, DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_MAX_ITERATIONS, KMeansConfig,
    KMeansResult, assign_to_nearest_centroid, kmeans_clustering,
};
pub use duplicates::{DuplicatePair, find_duplicate_pairs};
pub(crate) use similarity::cosine_similarity;
pub use similarity::score;
pub use types::{ClusterId, DEFAULT_DIMENSION, DistanceMetric, VectorDimension, VectorError};
