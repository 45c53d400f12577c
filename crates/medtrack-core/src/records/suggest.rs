//! Autocomplete over existing patient names.
//!
//! Ranking: prefix matches first, then substring matches, then names that
//! are merely similar (Jaro-Winkler). Ties keep the original order.

use strsim::jaro_winkler;

use crate::models::canonical_name;

/// Minimum similarity for a non-substring suggestion.
pub const SIMILARITY_THRESHOLD: f64 = 0.75;

/// Maximum number of suggestions returned.
pub const MAX_SUGGESTIONS: usize = 10;

/// Rank `names` against a partially typed `query`.
pub fn rank_names<'a, I>(names: I, query: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let query = canonical_name(query);
    let mut seen = Vec::new();
    let mut scored: Vec<(u8, f64, &str)> = Vec::new();

    for name in names {
        let canonical = canonical_name(name);
        if seen.contains(&canonical) {
            continue;
        }

        let score = if query.is_empty() || canonical.starts_with(&query) {
            Some((0, 1.0))
        } else if canonical.contains(&query) {
            Some((1, 1.0))
        } else {
            let similarity = jaro_winkler(&canonical, &query);
            (similarity >= SIMILARITY_THRESHOLD).then_some((2, similarity))
        };

        if let Some((tier, similarity)) = score {
            scored.push((tier, similarity, name));
        }
        seen.push(canonical);
    }

    scored.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
    });

    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, _, name)| name.to_string())
        .collect()
}
