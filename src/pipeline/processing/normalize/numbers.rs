//! Decimal parsing shared by the size and price normalizers.
//!
//! Both "." and "," are accepted as the fractional separator. A single ","
//! followed by exactly three digits is a thousands separator, so "1,500"
//! reads as 1500 and "1,5" as 1.5.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Digits with optional "." / "," groups, e.g. "1.5", "1,500", "1.234,56"
pub(crate) const NUMBER_PATTERN: &str = r"\d+(?:[.,]\d+)*";

/// Space-grouped thousands ("1 234,56") are only accepted when every group
/// after the first has exactly three digits.
static AMOUNT_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:[ \u{00A0}]\d{3})+(?:[.,]\d+)?|\d+(?:[.,]\d+)*")
        .expect("amount pattern is valid")
});

/// Parse a single numeric token, resolving decimal vs thousands separators.
pub fn parse_decimal(token: &str) -> Option<Decimal> {
    let cleaned: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let canonical = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        // Both present: whichever comes last is the decimal separator
        (Some(dot), Some(comma)) => {
            let (decimal, thousands) = if dot > comma { ('.', ',') } else { (',', '.') };
            let without_groups: String = cleaned.chars().filter(|c| *c != thousands).collect();
            if without_groups.matches(decimal).count() > 1 {
                return None;
            }
            without_groups.replace(decimal, ".")
        }
        (None, Some(_)) => resolve_single_separator(&cleaned, ',')?,
        (Some(_), None) => resolve_single_separator(&cleaned, '.')?,
        (None, None) => cleaned,
    };

    Decimal::from_str(&canonical).ok().map(|d| d.normalize())
}

/// Find the first amount in free text ("R 1 234,56", "ZAR45.99 each") and parse it.
pub fn first_amount(text: &str) -> Option<Decimal> {
    AMOUNT_RUN.find(text).and_then(|m| parse_decimal(m.as_str()))
}

fn resolve_single_separator(cleaned: &str, separator: char) -> Option<String> {
    let groups: Vec<&str> = cleaned.split(separator).collect();
    if groups.iter().any(|g| g.is_empty()) {
        return None;
    }

    if groups.len() > 2 {
        // Repeated separators can only be digit grouping ("1,234,567")
        return if groups[1..].iter().all(|g| g.len() == 3) {
            Some(groups.concat())
        } else {
            None
        };
    }

    if separator == ',' && groups[1].len() == 3 {
        Some(groups.concat())
    } else {
        Some(groups.join("."))
    }
}
