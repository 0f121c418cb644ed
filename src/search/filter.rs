//! Metadata equality filters.

use crate::types::Metadata;

/// True when every filter key is present in `metadata` with an equal value.
///
/// An empty filter accepts everything.
pub fn matches_filters(metadata: &Metadata, filters: &Metadata) -> bool {
    filters
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}
