//! Weighted fusion of semantic and keyword scores.
//!
//! BM25 scores are unbounded, so keyword scores are divided by the best
//! keyword score of the query before weighting. Semantic scores are used
//! as produced by the index metric.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Scales scores so the maximum becomes `1.0`. No-op when the maximum is
/// not positive.
pub fn normalize_by_max(scores: &mut [(String, f32)]) {
    let max = scores.iter().map(|(_, s)| *s).fold(f32::MIN, f32::max);
    if max > 0.0 {
        for (_, score) in scores.iter_mut() {
            *score /= max;
        }
    }
}

/// `semantic * semantic_weight + keyword * keyword_weight` per document.
///
/// A document absent from one side contributes 0 for that side and is
/// still ranked. Output is sorted by descending score, ties by id.
pub fn combine(
    semantic: &[(String, f32)],
    keyword: &[(String, f32)],
    semantic_weight: f32,
    keyword_weight: f32,
) -> Vec<(String, f32)> {
    let mut combined: HashMap<&str, f32> = HashMap::new();
    for (id, score) in semantic {
        *combined.entry(id.as_str()).or_default() += score * semantic_weight;
    }
    for (id, score) in keyword {
        *combined.entry(id.as_str()).or_default() += score * keyword_weight;
    }

    let mut ranked: Vec<(String, f32)> = combined
        .into_iter()
        .map(|(id, score)| (id.to_string(), score))
        .collect();
    sort_ranked(&mut ranked);
    ranked
}

/// Descending score, ascending id on ties.
pub fn sort_ranked(ranked: &mut [(String, f32)]) {
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(raw: &[(&str, f32)]) -> Vec<(String, f32)> {
        raw.iter().map(|(id, s)| (id.to_string(), *s)).collect()
    }

    #[test]
    fn test_missing_side_contributes_zero() {
        let semantic = scores(&[("a", 0.9), ("b", 0.1)]);
        let keyword = scores(&[("b", 1.0), ("c", 0.5)]);

        let ranked = combine(&semantic, &keyword, 0.5, 0.5);
        let expected = [("b", 0.55), ("a", 0.45), ("c", 0.25)];
        assert_eq!(ranked.len(), expected.len());
        for ((id, score), (want_id, want_score)) in ranked.iter().zip(expected) {
            assert_eq!(id, want_id);
            assert!((score - want_score).abs() < 1e-6);
        }
    }

    #[test]
    fn test_keyword_only_weighting() {
        let semantic = scores(&[("a", 0.99), ("b", 0.01)]);
        let keyword = scores(&[("b", 1.0)]);

        let ranked = combine(&semantic, &keyword, 0.0, 1.0);
        assert_eq!(ranked[0], ("b".to_string(), 1.0));
        assert_eq!(ranked[1], ("a".to_string(), 0.0));
    }

    #[test]
    fn test_normalize_by_max() {
        let mut raw = scores(&[("a", 4.0), ("b", 1.0)]);
        normalize_by_max(&mut raw);
        assert_eq!(raw, scores(&[("a", 1.0), ("b", 0.25)]));

        let mut empty: Vec<(String, f32)> = Vec::new();
        normalize_by_max(&mut empty);
        assert!(empty.is_empty());
    }
}
