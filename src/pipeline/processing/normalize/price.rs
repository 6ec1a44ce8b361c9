//! Currency string parsing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::numbers::first_amount;
use super::units::ParsedQuantity;

/// Scale kept on derived per-unit prices
const UNIT_PRICE_SCALE: u32 = 6;

/// Outcome of parsing one price string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceParse {
    /// A real, positive amount
    Amount(Decimal),
    /// Parsed to exactly zero; scrapers emit this for out-of-stock listings
    Zero,
    /// Text present but no amount recognized
    Unparseable,
    /// No text at all
    Missing,
}

impl PriceParse {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            PriceParse::Amount(amount) => Some(*amount),
            _ => None,
        }
    }
}

/// Where a record's per-unit price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitPriceSource {
    /// Parsed from the retailer's own per-unit price text
    Scraped,
    /// Computed as price / (quantity × multipack count)
    Derived,
}

/// Parse a free-text currency string such as "R123.45" or "R 1 234,56".
pub fn parse_price(text: Option<&str>) -> PriceParse {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return PriceParse::Missing;
    };

    match first_amount(text) {
        Some(amount) if amount.is_zero() => PriceParse::Zero,
        Some(amount) => PriceParse::Amount(amount),
        None => PriceParse::Unparseable,
    }
}

/// Price per base unit (gram, millilitre or each) across the whole pack
pub fn price_per_base_unit(price: Decimal, quantity: &ParsedQuantity) -> Option<Decimal> {
    let total = quantity.pack_total()?;
    if total.is_zero() {
        return None;
    }
    price
        .checked_div(total)
        .map(|per_unit| per_unit.round_dp(UNIT_PRICE_SCALE).normalize())
}
