//! Ranking building blocks used by the engine's query paths.

pub mod filter;
pub mod highlight;
pub mod hybrid;
pub mod recommend;
pub mod rerank;

pub use filter::matches_filters;
pub use highlight::{highlights, query_terms};
