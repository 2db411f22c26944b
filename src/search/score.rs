//! Approximate string similarity for name matching.
//!
//! Scores are in `[0, 100]`. The score is the maximum of a full
//! edit-distance ratio and a discounted token-set ratio, which keeps
//! single-word typos ("ahrensfeld" vs "ahrensfelde") high while still
//! matching multi-word names given out of order.

use std::collections::BTreeSet;

use strsim::normalized_levenshtein;

/// Weight applied to the token-set component, below the full ratio so an
/// exact-ish full match always outranks a token rearrangement.
const TOKEN_SET_WEIGHT: f64 = 0.95;

/// Similarity between a normalized query and a normalized candidate.
pub fn similarity(query: &str, candidate: &str) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if query == candidate {
        return 100.0;
    }

    let full = normalized_levenshtein(query, candidate) * 100.0;
    let token_set = token_set_ratio(query, candidate) * 100.0;
    full.max(token_set * TOKEN_SET_WEIGHT)
}

/// Token-set ratio: compare the sorted token intersection against each
/// side's full sorted token set and take the best pairwise edit ratio.
/// Insensitive to token order and duplication.
fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let base = intersection.join(" ");
    let combined_a = join_nonempty(&base, &only_a.join(" "));
    let combined_b = join_nonempty(&base, &only_b.join(" "));

    let r1 = normalized_levenshtein(&base, &combined_a);
    let r2 = normalized_levenshtein(&base, &combined_b);
    let r3 = normalized_levenshtein(&combined_a, &combined_b);

    // An empty intersection makes r1/r2 compare against "", which
    // normalized_levenshtein scores 0 (or 1 for two empties); the pairwise
    // max still gives a meaningful r3.
    r1.max(r2).max(r3)
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a} {b}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(similarity("ahrensfelde", "ahrensfelde"), 100.0);
    }

    #[test]
    fn test_single_char_typo_scores_high() {
        let s = similarity("ahrensfeld", "ahrensfelde");
        assert!(s >= 85.0, "score = {s}");
    }

    #[test]
    fn test_unrelated_names_score_low() {
        let s = similarity("ahrensfelde", "cottbus");
        assert!(s < 40.0, "score = {s}");
    }

    #[test]
    fn test_token_order_insensitive() {
        let s = similarity("oder frankfurt", "frankfurt oder");
        assert!(s >= 90.0, "score = {s}");
    }

    #[test]
    fn test_subset_tokens() {
        let s = similarity("bernau", "bernau bei berlin");
        let t = similarity("bernau", "brandenburg an der havel");
        assert!(s > t, "subset {s} vs unrelated {t}");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(similarity("", "ahrensfelde"), 0.0);
        assert_eq!(similarity("ahrensfelde", ""), 0.0);
    }

    #[test]
    fn test_range() {
        for (a, b) in [("a", "b"), ("abc", "abd"), ("x y", "y x"), ("q", "q")] {
            let s = similarity(a, b);
            assert!((0.0..=100.0).contains(&s), "{a} vs {b} -> {s}");
        }
    }
}
