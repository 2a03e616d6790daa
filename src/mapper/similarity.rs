//! Levenshtein-based parameter name similarity, ported from
//! `GeneralParameterMappingStrategy._smart_similarity_mapping` in the
//! system this spec was distilled from.

/// Normalized edit-distance similarity in `[0, 1]`. Names are folded to
/// lowercase and stripped of `_`/`-` before comparing, so `search_query`
/// and `searchquery` score identically. Exact match short-circuits to
/// `1.0`; a substring relationship short-circuits to `0.8` (matching the
/// original's hand-picked shortcut rather than running edit distance on
/// an already-obvious case).
pub fn similarity(a: &str, b: &str) -> f32 {
    let s1 = normalize(a);
    let s2 = normalize(b);

    if s1 == s2 {
        return 1.0;
    }
    if s1.is_empty() || s2.is_empty() {
        return 0.0;
    }
    if s1.contains(&s2) || s2.contains(&s1) {
        return 0.8;
    }

    let distance = levenshtein_distance(&s1, &s2);
    let max_len = s1.chars().count().max(s2.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (distance as f32 / max_len as f32)
}

fn normalize(s: &str) -> String {
    s.to_lowercase().replace(['_', '-'], "")
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if b.is_empty() {
        return a.len();
    }
    let mut previous_row: Vec<usize> = (0..=b.len()).collect();
    for (i, c1) in a.iter().enumerate() {
        let mut current_row = vec![i + 1];
        for (j, c2) in b.iter().enumerate() {
            let insertions = previous_row[j + 1] + 1;
            let deletions = current_row[j] + 1;
            let substitutions = previous_row[j] + usize::from(c1 != c2);
            current_row.push(insertions.min(deletions).min(substitutions));
        }
        previous_row = current_row;
    }
    *previous_row.last().unwrap()
}

/// The similarity threshold below which a candidate is rejected, per the
/// original's `score > 0.3` gate.
pub const SIMILARITY_THRESHOLD: f32 = 0.3;

/// Finds the best-scoring candidate among `available_params` for
/// `target_param`, returning `None` if nothing clears
/// [`SIMILARITY_THRESHOLD`].
pub fn best_match<'a>(
    target_param: &str,
    available_params: impl IntoIterator<Item = (&'a str, &'a serde_json::Value)>,
) -> Option<&'a serde_json::Value> {
    let mut best: Option<(f32, &'a serde_json::Value)> = None;
    for (name, value) in available_params {
        let score = similarity(target_param, name);
        if score > SIMILARITY_THRESHOLD {
            let better = match best {
                Some((best_score, _)) => score > best_score,
                None => true,
            };
            if better {
                best = Some((score, value));
            }
        }
    }
    best.map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_names_score_one() {
        assert_eq!(similarity("query", "query"), 1.0);
    }

    #[test]
    fn underscore_insensitive_exact_match() {
        assert_eq!(similarity("search_query", "searchquery"), 1.0);
    }

    #[test]
    fn substring_relationship_scores_point_eight() {
        assert_eq!(similarity("query", "search_query_text"), 0.8);
    }

    #[test]
    fn unrelated_names_score_low() {
        assert!(similarity("query", "timeout") < 0.3);
    }

    #[test]
    fn best_match_picks_highest_scoring_candidate() {
        let keyword = serde_json::json!("hello");
        let kw = serde_json::json!("bye");
        let params = vec![("keyword", &keyword), ("kw", &kw)];
        let result = best_match("keywrd", params);
        assert_eq!(result, Some(&keyword));
    }

    proptest! {
        /// The scorer must never escape `[0, 1]` regardless of input,
        /// since callers compare it directly against
        /// [`SIMILARITY_THRESHOLD`] without clamping.
        #[test]
        fn similarity_is_always_in_unit_range(a in "[a-zA-Z0-9_-]{0,24}", b in "[a-zA-Z0-9_-]{0,24}") {
            let score = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        /// Edit distance, substring, and equality are all symmetric, so
        /// the scorer built on top of them must be too.
        #[test]
        fn similarity_is_symmetric(a in "[a-zA-Z0-9_-]{0,24}", b in "[a-zA-Z0-9_-]{0,24}") {
            prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }

        /// Any string is maximally similar to itself.
        #[test]
        fn identical_strings_always_score_one(s in "[a-zA-Z0-9_-]{0,24}") {
            prop_assert_eq!(similarity(&s, &s), 1.0);
        }
    }
}
