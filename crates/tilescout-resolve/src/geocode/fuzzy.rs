//! Pluggable string similarity for fuzzy fallback matching.

use tilescout_core::Coordinate;

use super::fallback::FallbackTable;

/// A fuzzy fallback match must score strictly above this (0.0 to 1.0).
pub const FUZZY_THRESHOLD: f64 = 0.55;

/// Scores how alike two normalized strings are, from 0.0 to 1.0.
///
/// Any `Fn(&str, &str) -> f64` closure is a `StringSimilarity`, so tests
/// and callers can swap the metric without touching the resolver.
pub trait StringSimilarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

impl<F> StringSimilarity for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn score(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Larger of normalized Levenshtein and Sørensen–Dice bigram overlap.
///
/// Levenshtein catches typos ("airprot"); bigram overlap catches extra or
/// reordered words ("marina coastal", "airport terminal").
#[derive(Debug, Clone, Copy, Default)]
pub struct BlendedSimilarity;

impl StringSimilarity for BlendedSimilarity {
    fn score(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b).max(strsim::sorensen_dice(a, b))
    }
}

/// A fallback phrase chosen by fuzzy matching.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch<'a> {
    pub phrase: &'a str,
    pub coordinate: Coordinate,
    pub score: f64,
}

/// Best-scoring table entry strictly above `threshold`.
///
/// Ties keep the earlier entry in table order.
pub fn best_match<'a>(
    table: &'a FallbackTable,
    query: &str,
    metric: &dyn StringSimilarity,
    threshold: f64,
) -> Option<FuzzyMatch<'a>> {
    let mut best: Option<FuzzyMatch<'a>> = None;
    for (phrase, coordinate) in table.iter() {
        let score = metric.score(query, phrase);
        if score <= threshold {
            continue;
        }
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(FuzzyMatch {
                phrase,
                coordinate,
                score,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typo_matches_airport() {
        let table = FallbackTable::default();
        let m = best_match(&table, "airprot", &BlendedSimilarity, FUZZY_THRESHOLD).unwrap();
        assert_eq!(m.phrase, "airport");
        assert!(m.score > FUZZY_THRESHOLD);
    }

    #[test]
    fn test_plural_matches_marina() {
        let table = FallbackTable::default();
        let m = best_match(&table, "marinas", &BlendedSimilarity, FUZZY_THRESHOLD).unwrap();
        assert_eq!(m.phrase, "marina");
    }

    #[test]
    fn test_unrelated_text_has_no_match() {
        let table = FallbackTable::default();
        assert!(best_match(&table, "xyzzy qwv", &BlendedSimilarity, FUZZY_THRESHOLD).is_none());
    }

    #[test]
    fn test_score_at_threshold_is_rejected() {
        let table = FallbackTable::default();
        let at = |_: &str, _: &str| FUZZY_THRESHOLD;
        assert!(best_match(&table, "anything", &at, FUZZY_THRESHOLD).is_none());
    }

    #[test]
    fn test_closure_metric_and_tie_order() {
        let table = FallbackTable::default();
        let constant = |_: &str, _: &str| 0.9;
        let m = best_match(&table, "anything", &constant, FUZZY_THRESHOLD).unwrap();
        // Every entry ties; the first one in table order wins.
        assert_eq!(m.phrase, "marina");
    }

    #[test]
    fn test_blended_score_is_bounded() {
        let metric = BlendedSimilarity;
        assert!((metric.score("downtown", "downtown") - 1.0).abs() < 1e-12);
        let s = metric.score("downtwon", "downtown");
        assert!((0.0..=1.0).contains(&s));
        assert!(s > FUZZY_THRESHOLD);
    }
}
