//! FILENAME: src/fuzzy.rs
//! Fuzzy Matcher - Approximate substring search over a field.
//!
//! Scoring is an edit-distance variant where unmatched text before and
//! after the match is free, so a short query can hit anywhere inside a
//! longer value ("sho" finds "Snow Shoes" at distance 0). Adjacent
//! transpositions count as a single edit, which is what makes the matcher
//! typo-tolerant rather than substring-exact.
//!
//! A candidate is accepted when its best distance stays within a fraction
//! of the query length; results come back best match first, ties in input
//! order.

use crate::cache::TableCache;
use crate::definition::FieldIndex;

/// Accepted edits per query character. 0.4 lets one typo through for a
/// five-letter query while still rejecting unrelated words.
const MAX_SCORE: f64 = 0.4;

/// Best edit distance between `query` and any substring of `text`.
///
/// Standard Levenshtein with two changes: the first matrix row is zero
/// (free prefix skip) and the result is the minimum of the last row (free
/// suffix skip). Adjacent transpositions cost one edit.
pub fn substring_distance(query: &str, text: &str) -> usize {
    let query: Vec<char> = query.chars().collect();
    let text: Vec<char> = text.chars().collect();

    if query.is_empty() {
        return 0;
    }
    if text.is_empty() {
        return query.len();
    }

    let cols = text.len() + 1;
    let mut prev2 = vec![0usize; cols];
    let mut prev = vec![0usize; cols];
    let mut curr = vec![0usize; cols];

    for (i, &qc) in query.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &tc) in text.iter().enumerate() {
            let cost = if qc == tc { 0 } else { 1 };
            let mut best = (prev[j] + cost)
                .min(prev[j + 1] + 1)
                .min(curr[j] + 1);

            // Adjacent transposition (optimal string alignment).
            if i > 0 && j > 0 && qc == text[j - 1] && query[i - 1] == tc {
                best = best.min(prev2[j - 1] + cost);
            }

            curr[j + 1] = best;
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    // `prev` holds the last computed row after the final swap.
    prev.iter().copied().min().unwrap_or(query.len())
}

/// Distance of `query` against a field value, case-insensitive and coerced
/// to the display string for non-text values.
fn value_distance(cache: &TableCache, index: u32, field: FieldIndex, query: &str) -> usize {
    let text = cache.value(index, field).display_string().to_lowercase();
    substring_distance(query, &text)
}

/// Runs the matcher over `candidates`, keeping records whose best distance
/// is within the acceptance threshold. The result is ordered ascending by
/// distance; equal distances preserve candidate order. An empty query
/// bypasses the matcher and returns the candidates unchanged.
pub fn fuzzy_match(
    cache: &TableCache,
    candidates: &[u32],
    field: FieldIndex,
    query: &str,
) -> Vec<u32> {
    if query.is_empty() {
        return candidates.to_vec();
    }

    let query = query.to_lowercase();
    let max_distance = (query.chars().count() as f64 * MAX_SCORE).floor() as usize;

    let mut scored: Vec<(usize, u32)> = candidates
        .iter()
        .filter_map(|&index| {
            let distance = value_distance(cache, index, field, &query);
            (distance <= max_distance).then_some((distance, index))
        })
        .collect();

    scored.sort_by_key(|&(distance, _)| distance);
    scored.into_iter().map(|(_, index)| index).collect()
}
