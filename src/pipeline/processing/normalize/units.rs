//! Size / weight / volume parsing into a canonical (quantity, base unit) pair.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::numbers::{parse_decimal, NUMBER_PATTERN};

/// Unit alternatives, longest spelling first within each family
pub(crate) const UNIT_PATTERN: &str = r"kilograms?|kilos?|kgs?|grammes?|grams?|gr|g|millilit(?:re|er)s?|mls?|lit(?:re|er)s?|ltrs?|lt|l|each|ea";

static MEASURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)({NUMBER_PATTERN})\s*({UNIT_PATTERN})\b")).expect("measure pattern is valid")
});

static MULTIPACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)(?:^|[^\d.,])(\d+)\s*[x×]\s*({NUMBER_PATTERN}\s*(?:{UNIT_PATTERN})\b)"
    ))
    .expect("multipack pattern is valid")
});

static BARE_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)\s*$").expect("count pattern is valid"));

static BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^\s*{NUMBER_PATTERN}\s*$")).expect("bare number pattern is valid"));

/// Canonical unit every quantity is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseUnit {
    Gram,
    Millilitre,
    Each,
}

impl BaseUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            BaseUnit::Gram => "g",
            BaseUnit::Millilitre => "ml",
            BaseUnit::Each => "each",
        }
    }
}

impl fmt::Display for BaseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Result of a successful size parse.
///
/// For multipacks `quantity` is the per-unit quantity and `multipack_count`
/// the number of units, so "6 x 100g" is 100 g with a count of 6.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuantity {
    pub quantity: Decimal,
    pub base_unit: BaseUnit,
    pub multipack_count: u32,
}

impl ParsedQuantity {
    /// Quantity across the whole pack (per-unit quantity × count).
    /// `None` when the product does not fit in a `Decimal`.
    pub fn pack_total(&self) -> Option<Decimal> {
        self.quantity.checked_mul(Decimal::from(self.multipack_count))
    }
}

impl fmt::Display for ParsedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multipack_count > 1 {
            write!(f, "{} x {} {}", self.multipack_count, self.quantity, self.base_unit)
        } else {
            write!(f, "{} {}", self.quantity, self.base_unit)
        }
    }
}

/// Parse a free-text size string. Returns `None` when no recognizable
/// quantity and unit are present; never fails loudly.
pub fn parse_quantity(text: &str) -> Option<ParsedQuantity> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = MULTIPACK.captures(text) {
        let count = caps[1].parse::<u32>().ok().filter(|n| *n >= 1);
        if let (Some(count), Some(single)) = (count, parse_single(&caps[2])) {
            return Some(ParsedQuantity {
                multipack_count: count,
                ..single
            });
        }
    }

    if let Some(single) = parse_single(text) {
        return Some(single);
    }

    BARE_COUNT.captures(text).and_then(|caps| {
        let count = parse_decimal(&caps[1])?;
        (count > Decimal::ZERO).then_some(ParsedQuantity {
            quantity: count,
            base_unit: BaseUnit::Each,
            multipack_count: 1,
        })
    })
}

/// Parse the size string, retrying with the separate unit-of-measure field
/// appended when the size is a bare number ("500" + "g", "1,5" + "l").
pub fn parse_quantity_with_unit(size: Option<&str>, unit_of_measure: Option<&str>) -> Option<ParsedQuantity> {
    let size = size?;
    match unit_of_measure {
        Some(unit) if !unit.trim().is_empty() && BARE_NUMBER.is_match(size) => {
            parse_quantity(&format!("{} {}", size.trim(), unit.trim())).or_else(|| parse_quantity(size))
        }
        _ => parse_quantity(size),
    }
}

fn parse_single(text: &str) -> Option<ParsedQuantity> {
    let caps = MEASURE.captures(text)?;
    let value = parse_decimal(&caps[1])?;
    if value <= Decimal::ZERO {
        return None;
    }

    let (base_unit, factor) = unit_factor(&caps[2].to_lowercase())?;
    let quantity = value.checked_mul(Decimal::from(factor))?;
    Some(ParsedQuantity {
        quantity: quantity.normalize(),
        base_unit,
        multipack_count: 1,
    })
}

fn unit_factor(unit: &str) -> Option<(BaseUnit, u32)> {
    let factor = match unit {
        "kilogram" | "kilograms" | "kilo" | "kilos" | "kg" | "kgs" => (BaseUnit::Gram, 1000),
        "gramme" | "grammes" | "gram" | "grams" | "gr" | "g" => (BaseUnit::Gram, 1),
        "millilitre" | "millilitres" | "milliliter" | "milliliters" | "ml" | "mls" => (BaseUnit::Millilitre, 1),
        "litre" | "litres" | "liter" | "liters" | "ltr" | "ltrs" | "lt" | "l" => (BaseUnit::Millilitre, 1000),
        "each" | "ea" => (BaseUnit::Each, 1),
        _ => return None,
    };
    Some(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn parsed(text: &str) -> (Decimal, BaseUnit, u32) {
        let q = parse_quantity(text).unwrap_or_else(|| panic!("expected {text:?} to parse"));
        (q.quantity, q.base_unit, q.multipack_count)
    }

    #[test]
    fn test_base_unit_conversion() {
        assert_eq!(parsed("500g"), (dec("500"), BaseUnit::Gram, 1));
        assert_eq!(parsed("2kg"), (dec("2000"), BaseUnit::Gram, 1));
        assert_eq!(parsed("1.5 kg"), (dec("1500"), BaseUnit::Gram, 1));
        assert_eq!(parsed("750 ml"), (dec("750"), BaseUnit::Millilitre, 1));
        assert_eq!(parsed("2L"), (dec("2000"), BaseUnit::Millilitre, 1));
        assert_eq!(parsed("1.5L"), (dec("1500"), BaseUnit::Millilitre, 1));
    }

    #[test]
    fn test_unit_words_are_case_insensitive() {
        assert_eq!(parsed("2 Kilograms"), (dec("2000"), BaseUnit::Gram, 1));
        assert_eq!(parsed("250 GRAMS"), (dec("250"), BaseUnit::Gram, 1));
        assert_eq!(parsed("1 Litre"), (dec("1000"), BaseUnit::Millilitre, 1));
        assert_eq!(parsed("330 Millilitres"), (dec("330"), BaseUnit::Millilitre, 1));
    }

    #[test]
    fn test_each_and_bare_integer() {
        assert_eq!(parsed("12 each"), (dec("12"), BaseUnit::Each, 1));
        assert_eq!(parsed("4ea"), (dec("4"), BaseUnit::Each, 1));
        assert_eq!(parsed("6"), (dec("6"), BaseUnit::Each, 1));
    }

    #[test]
    fn test_multipack_keeps_per_unit_quantity() {
        assert_eq!(parsed("6x100g"), (dec("100"), BaseUnit::Gram, 6));
        assert_eq!(parsed("6 x 100g"), (dec("100"), BaseUnit::Gram, 6));
        assert_eq!(parsed("4 X 1.5kg"), (dec("1500"), BaseUnit::Gram, 4));
        assert_eq!(parsed("24×330ml"), (dec("330"), BaseUnit::Millilitre, 24));
        assert_eq!(parse_quantity("6 x 100g").unwrap().pack_total(), Some(dec("600")));
    }

    #[test]
    fn test_thousands_separator_is_not_decimal() {
        assert_eq!(parsed("1,500g"), (dec("1500"), BaseUnit::Gram, 1));
        assert_eq!(parsed("1,5kg"), (dec("1500"), BaseUnit::Gram, 1));
    }

    #[test]
    fn test_size_inside_longer_text() {
        assert_eq!(parsed("Frozen peas 1kg bag"), (dec("1000"), BaseUnit::Gram, 1));
    }

    #[test]
    fn test_unparseable_returns_none() {
        assert!(parse_quantity("").is_none());
        assert!(parse_quantity("family size").is_none());
        assert!(parse_quantity("0g").is_none());
        assert!(parse_quantity("500 grapes").is_none());
    }

    #[test]
    fn test_unit_of_measure_fallback() {
        let q = parse_quantity_with_unit(Some("500"), Some("g")).unwrap();
        assert_eq!((q.quantity, q.base_unit), (dec("500"), BaseUnit::Gram));

        let q = parse_quantity_with_unit(Some("2kg"), Some("each")).unwrap();
        assert_eq!((q.quantity, q.base_unit), (dec("2000"), BaseUnit::Gram));

        assert!(parse_quantity_with_unit(None, Some("g")).is_none());
    }

    #[test]
    fn test_unit_of_measure_fallback_accepts_fractions() {
        let q = parse_quantity_with_unit(Some("1.5"), Some("kg")).unwrap();
        assert_eq!((q.quantity, q.base_unit), (dec("1500"), BaseUnit::Gram));

        let q = parse_quantity_with_unit(Some("1,5"), Some("l")).unwrap();
        assert_eq!((q.quantity, q.base_unit), (dec("1500"), BaseUnit::Millilitre));

        // An unknown unit still leaves whole numbers as a count
        let q = parse_quantity_with_unit(Some("6"), Some("pack")).unwrap();
        assert_eq!((q.quantity, q.base_unit), (dec("6"), BaseUnit::Each));
        assert!(parse_quantity_with_unit(Some("1.5"), Some("pack")).is_none());
    }

    #[test]
    fn test_oversized_quantities_do_not_panic() {
        assert!(parse_quantity("79228162514264337593543950335kg").is_none());

        let huge = parse_quantity("4000000000 x 79228162514264337593543950g").unwrap();
        assert_eq!(huge.multipack_count, 4_000_000_000);
        assert_eq!(huge.pack_total(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(parse_quantity("6 x 100g").unwrap().to_string(), "6 x 100 g");
        assert_eq!(parse_quantity("1.5L").unwrap().to_string(), "1500 ml");
    }
}
