//! Recommendation diversity and preference weighting.
//!
//! Diversity is crude: each candidate's sort key gets uniform jitter in
//! `[-diversity, diversity)` while the reported score stays the true
//! similarity. It does not account for similarity between picked items the
//! way maximal marginal relevance would; MMR over the candidate vectors is
//! the natural replacement.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Metadata, UserPreferences};

/// Weight of the base relevance score in personalized ranking.
pub const BASE_WEIGHT: f32 = 0.7;
/// Weight of the preference score in personalized ranking.
pub const PREFERENCE_WEIGHT: f32 = 0.3;
/// Preference score when no stored preference applies.
pub const NEUTRAL_PREFERENCE: f32 = 0.5;

/// Orders `scored` by score plus random jitter scaled by `diversity`.
///
/// With `diversity <= 0` this is a plain stable descending sort.
pub fn diversify(scored: &mut Vec<(String, f32)>, diversity: f32, seed: Option<u64>) {
    if diversity <= 0.0 {
        sort_desc(scored, |entry| entry.1);
        return;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let mut keyed: Vec<(f32, (String, f32))> = scored
        .drain(..)
        .map(|entry| (entry.1 + rng.random_range(-1.0f32..1.0) * diversity, entry))
        .collect();
    sort_desc(&mut keyed, |(key, _)| *key);
    scored.extend(keyed.into_iter().map(|(_, entry)| entry));
}

fn sort_desc<T>(items: &mut [T], key: impl Fn(&T) -> f32) {
    items.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

/// Average of the user's weights that apply to `metadata`.
///
/// For each metadata entry the `"key:value"` preference wins over a bare
/// `"key"` preference. Returns [`NEUTRAL_PREFERENCE`] when nothing applies.
pub fn preference_score(metadata: &Metadata, preferences: &UserPreferences) -> f32 {
    let weights: Vec<f32> = metadata
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            preferences
                .get(&format!("{key}:{value}"))
                .or_else(|| preferences.get(key))
        })
        .collect();

    if weights.is_empty() {
        NEUTRAL_PREFERENCE
    } else {
        weights.iter().sum::<f32>() / weights.len() as f32
    }
}

/// `base * 0.7 + preference * 0.3`.
pub fn personalize(base: f32, preference: f32) -> f32 {
    base * BASE_WEIGHT + preference * PREFERENCE_WEIGHT
}
