//! Per-index storage.

mod collection;

pub use collection::Collection;
