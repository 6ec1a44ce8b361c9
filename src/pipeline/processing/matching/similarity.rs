//! Name similarity metrics, all scored on a 0..=100 scale.

/// Trait for scoring two canonical names against each other
pub trait SimilarityMetric: Send + Sync {
    /// Name used in logs and configuration
    fn name(&self) -> &'static str;

    /// Comparison key for one canonical name; computed once per record
    fn key(&self, tokens: &[String]) -> String {
        sorted_key(tokens)
    }

    /// Score two keys. Must be symmetric.
    fn compare(&self, a: &str, b: &str) -> f64;

    fn score(&self, a: &[String], b: &[String]) -> f64 {
        self.compare(&self.key(a), &self.key(b))
    }
}

/// Token-sort ratio: tokens sorted alphabetically, then scored by the
/// InDel-normalized ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl SimilarityMetric for TokenSortRatio {
    fn name(&self) -> &'static str {
        "token_sort_ratio"
    }

    fn compare(&self, a: &str, b: &str) -> f64 {
        indel_ratio(a, b)
    }
}

/// Sorted tokens scored with normalized Levenshtein distance
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortLevenshtein;

impl SimilarityMetric for TokenSortLevenshtein {
    fn name(&self) -> &'static str {
        "token_sort_levenshtein"
    }

    fn compare(&self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        strsim::normalized_levenshtein(a, b) * 100.0
    }
}

/// Tokens sorted alphabetically and joined with single spaces
pub fn sorted_key(tokens: &[String]) -> String {
    let mut sorted: Vec<&str> = tokens.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.join(" ")
}

/// InDel similarity in 0..=100. Empty names never match anything.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    rapidfuzz::fuzz::ratio(a.chars(), b.chars()) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_word_order_does_not_matter() {
        let metric = TokenSortRatio;
        let score = metric.score(&tokens("chicken nuggets frozen"), &tokens("frozen chicken nuggets"));
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_indel_ratio_values() {
        assert_eq!(indel_ratio("abc", "abc"), 100.0);
        assert_eq!(indel_ratio("abc", "xyz"), 0.0);
        // One deletion over nine characters
        let score = indel_ratio("chips", "chip");
        assert!((score - 800.0 / 9.0).abs() < 1e-9);
        // Multibyte characters count once
        let score = indel_ratio("crème brûlée", "creme brulee");
        assert!((score - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_names_score_zero() {
        assert_eq!(TokenSortRatio.score(&[], &tokens("peas")), 0.0);
        assert_eq!(TokenSortRatio.score(&[], &[]), 0.0);
        assert_eq!(TokenSortLevenshtein.score(&[], &[]), 0.0);
    }

    #[test]
    fn test_scores_are_symmetric() {
        let names = [
            "frozen chicken nuggets",
            "chicken strips crumbed",
            "mixed vegetables",
            "garden peas",
            "vanilla ice cream",
            "ice cream vanilla tub",
        ];
        for metric in [&TokenSortRatio as &dyn SimilarityMetric, &TokenSortLevenshtein] {
            for a in names {
                for b in names {
                    let ab = metric.score(&tokens(a), &tokens(b));
                    let ba = metric.score(&tokens(b), &tokens(a));
                    assert_eq!(ab, ba, "{} asymmetric for {a:?} / {b:?}", metric.name());
                }
            }
        }
    }

    #[test]
    fn test_similar_names_clear_default_threshold() {
        let score = TokenSortRatio.score(&tokens("vanilla ice cream"), &tokens("ice cream vanilla tub"));
        assert!(score >= 80.0, "score was {score}");

        let score = TokenSortRatio.score(&tokens("garden peas"), &tokens("vanilla ice cream"));
        assert!(score < 80.0, "score was {score}");
    }
}
