//! Product name and brand canonicalization.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::numbers::NUMBER_PATTERN;
use super::units::UNIT_PATTERN;

/// Retailer names and house-brand boilerplate that never distinguish products
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "shoprite",
    "checkers",
    "pnp",
    "picknpay",
    "ritebrand",
    "housebrand",
    "usave",
    "sixty60",
    "promo",
    "special",
];

/// Placeholder strings scrapers write for missing values
const NULL_PLACEHOLDERS: &[&str] = &["none", "nan", "null", "n/a"];

/// Multipack and single size fragments ("6 x 100g", "500 g", "1.5kg")
static SIZE_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:\d+\s*[x×]\s*)?{NUMBER_PATTERN}\s*(?:{UNIT_PATTERN})\b"
    ))
    .expect("size fragment pattern is valid")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Trim, collapse whitespace and map scraper placeholders to `None`.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() || NULL_PLACEHOLDERS.contains(&trimmed.to_lowercase().as_str()) {
        return None;
    }
    Some(WHITESPACE.replace_all(trimmed, " ").into_owned())
}

/// Reduces names to comparable token sequences.
///
/// Word order is preserved; only size fragments, stopwords and the record's
/// own brand are removed.
#[derive(Debug, Clone)]
pub struct TextCanonicalizer {
    stopwords: HashSet<String>,
    strip_brand: bool,
}

impl Default for TextCanonicalizer {
    fn default() -> Self {
        Self::new(true, &[])
    }
}

impl TextCanonicalizer {
    pub fn new(strip_brand: bool, extra_stopwords: &[String]) -> Self {
        let stopwords = DEFAULT_STOPWORDS
            .iter()
            .map(|s| s.to_string())
            .chain(extra_stopwords.iter().map(|s| s.trim().to_lowercase()))
            .filter(|s| !s.is_empty())
            .collect();
        Self { stopwords, strip_brand }
    }

    /// Cleaned brand, empty when unknown
    pub fn clean_brand(&self, brand: Option<&str>) -> String {
        clean_text(brand).unwrap_or_default()
    }

    /// Lowercased, punctuation-free tokens with sizes, stopwords and the
    /// brand removed. Removal is skipped when it would leave nothing.
    pub fn canonicalize(&self, name: &str, brand: &str) -> Vec<String> {
        let tokens = tokenize(&SIZE_FRAGMENT.replace_all(&name.to_lowercase(), " "));

        let without_stopwords: Vec<String> = tokens
            .iter()
            .filter(|t| !self.stopwords.contains(t.as_str()))
            .cloned()
            .collect();
        let tokens = if without_stopwords.is_empty() { tokens } else { without_stopwords };

        if !self.strip_brand || brand.is_empty() {
            return tokens;
        }
        let brand_tokens = tokenize(&brand.to_lowercase());
        match remove_sequence(&tokens, &brand_tokens) {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => tokens,
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let spaced: String = text
        .chars()
        .filter(|c| *c != '\'' && *c != '’')
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    spaced.split_whitespace().map(str::to_string).collect()
}

/// Remove the first contiguous occurrence of `needle` from `tokens`
fn remove_sequence(tokens: &[String], needle: &[String]) -> Option<Vec<String>> {
    if needle.is_empty() || needle.len() > tokens.len() {
        return None;
    }
    let start = tokens.windows(needle.len()).position(|w| w == needle)?;
    let mut out = tokens[..start].to_vec();
    out.extend_from_slice(&tokens[start + needle.len()..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[String]) -> Vec<&str> {
        tokens.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  Frozen   Peas \n")), Some("Frozen Peas".to_string()));
        assert_eq!(clean_text(Some("nan")), None);
        assert_eq!(clean_text(Some("None")), None);
        assert_eq!(clean_text(Some("")), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        let canon = TextCanonicalizer::default();
        let tokens = canon.canonicalize("Crumbed Fish-Fingers, (Value Pack)!", "");
        assert_eq!(words(&tokens), ["crumbed", "fish", "fingers", "value", "pack"]);
    }

    #[test]
    fn test_apostrophes_do_not_split_words() {
        let canon = TextCanonicalizer::default();
        assert_eq!(words(&canon.canonicalize("Grandma's Pies", "")), ["grandmas", "pies"]);
    }

    #[test]
    fn test_removes_size_fragments() {
        let canon = TextCanonicalizer::default();
        assert_eq!(
            words(&canon.canonicalize("Chicken Nuggets Frozen 500 g", "")),
            ["chicken", "nuggets", "frozen"]
        );
        assert_eq!(words(&canon.canonicalize("Mixed Veg 1.5kg", "")), ["mixed", "veg"]);
        assert_eq!(words(&canon.canonicalize("Ice Lollies 6 x 100ml", "")), ["ice", "lollies"]);
    }

    #[test]
    fn test_keeps_numbers_without_units() {
        let canon = TextCanonicalizer::default();
        assert_eq!(words(&canon.canonicalize("Pizza 2 Pack", "")), ["pizza", "2", "pack"]);
    }

    #[test]
    fn test_removes_stopwords_unless_nothing_left() {
        let canon = TextCanonicalizer::default();
        assert_eq!(words(&canon.canonicalize("Ritebrand Frozen Peas", "")), ["frozen", "peas"]);
        assert_eq!(words(&canon.canonicalize("Checkers", "")), ["checkers"]);
    }

    #[test]
    fn test_strips_brand_sequence() {
        let canon = TextCanonicalizer::default();
        assert_eq!(
            words(&canon.canonicalize("McCain Oven Chips", "McCain")),
            ["oven", "chips"]
        );
        assert_eq!(
            words(&canon.canonicalize("Like Meat Like Chicken Strips", "Like Meat")),
            ["like", "chicken", "strips"]
        );
        // Brand-only names keep the brand
        assert_eq!(words(&canon.canonicalize("Sasko", "Sasko")), ["sasko"]);
    }

    #[test]
    fn test_brand_stripping_can_be_disabled() {
        let canon = TextCanonicalizer::new(false, &[]);
        assert_eq!(
            words(&canon.canonicalize("McCain Oven Chips", "McCain")),
            ["mccain", "oven", "chips"]
        );
    }

    #[test]
    fn test_extra_stopwords() {
        let canon = TextCanonicalizer::new(true, &["Value".to_string()]);
        assert_eq!(words(&canon.canonicalize("Value Fish Fingers", "")), ["fish", "fingers"]);
    }
}
