pub mod numbers;
pub mod price;
pub mod text;
pub mod units;

use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::RawProductRecord;
use price::{parse_price, price_per_base_unit, PriceParse, UnitPriceSource};
use text::{clean_text, TextCanonicalizer};
use units::{parse_quantity_with_unit, BaseUnit};

/// A product record reduced to canonical, comparable form.
///
/// Built from exactly one [`RawProductRecord`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProductRecord {
    /// Position of the raw record in the input batch
    pub source_index: usize,
    /// Cleaned display name
    pub product_name: Option<String>,
    /// Lowercase, punctuation-free tokens used for matching
    pub canonical_name: Vec<String>,
    /// Cleaned brand, empty when unknown
    pub brand: String,
    /// Cleaned size text as the retailer wrote it
    pub size_description: Option<String>,
    /// Per-unit quantity in `base_unit`
    pub quantity: Option<Decimal>,
    pub base_unit: Option<BaseUnit>,
    /// Units in a multipack, 1 for single items
    pub multipack_count: u32,
    pub price: Option<Decimal>,
    /// Retailer's per-unit price, or derived from price and quantity
    pub price_per_unit: Option<Decimal>,
    pub price_per_unit_source: Option<UnitPriceSource>,
    /// price / (quantity × multipack_count)
    pub price_per_base_unit: Option<Decimal>,
    pub retailer: String,
    pub product_url: Option<String>,
    pub category: Option<String>,
    pub department: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    /// Fields that could not be parsed and were left absent
    pub warnings: Vec<NormalizationWarning>,
}

/// Recoverable per-field problems found while normalizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationWarning {
    EmptyName,
    UnparseableSize,
    UnparseablePrice,
    ZeroPrice,
    UnparseableUnitPrice,
    UnparseableTimestamp,
}

impl NormalizationWarning {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationWarning::EmptyName => "empty_name",
            NormalizationWarning::UnparseableSize => "unparseable_size",
            NormalizationWarning::UnparseablePrice => "unparseable_price",
            NormalizationWarning::ZeroPrice => "zero_price",
            NormalizationWarning::UnparseableUnitPrice => "unparseable_unit_price",
            NormalizationWarning::UnparseableTimestamp => "unparseable_timestamp",
        }
    }
}

impl NormalizedProductRecord {
    /// Number of populated optional fields; used to pick a cluster's representative
    pub fn completeness(&self) -> usize {
        [
            self.product_name.is_some(),
            !self.brand.is_empty(),
            self.size_description.is_some(),
            self.quantity.is_some(),
            self.base_unit.is_some(),
            self.price.is_some(),
            self.price_per_unit.is_some(),
            self.product_url.is_some(),
            self.category.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// Canonical tokens joined with single spaces
    pub fn canonical_text(&self) -> String {
        self.canonical_name.join(" ")
    }

    /// Human-readable size: the retailer's text, else the parsed quantity
    pub fn size_label(&self) -> Option<String> {
        if let Some(size) = &self.size_description {
            return Some(size.clone());
        }
        match (self.quantity, self.base_unit) {
            (Some(q), Some(unit)) if self.multipack_count > 1 => {
                Some(format!("{} x {} {}", self.multipack_count, q, unit))
            }
            (Some(q), Some(unit)) => Some(format!("{} {}", q, unit)),
            _ => None,
        }
    }
}

/// Settings for the per-record normalization stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Remove the record's own brand from its canonical name
    pub strip_brand: bool,
    /// Stopwords added to the built-in retailer boilerplate list
    pub extra_stopwords: Vec<String>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            strip_brand: true,
            extra_stopwords: Vec::new(),
        }
    }
}

/// Trait for turning raw listings into canonical records
pub trait ProductNormalizer: Send + Sync {
    /// Normalize one record. Must be pure: no shared mutable state.
    fn normalize(&self, source_index: usize, record: &RawProductRecord) -> NormalizedProductRecord;
}

/// Default normalizer built from the unit, price and text normalizers
#[derive(Debug, Clone, Default)]
pub struct DefaultNormalizer {
    text: TextCanonicalizer,
}

impl DefaultNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &NormalizeConfig) -> Self {
        Self {
            text: TextCanonicalizer::new(config.strip_brand, &config.extra_stopwords),
        }
    }
}

impl ProductNormalizer for DefaultNormalizer {
    fn normalize(&self, source_index: usize, record: &RawProductRecord) -> NormalizedProductRecord {
        let mut warnings = Vec::new();

        let product_name = clean_text(record.name.as_deref());
        let brand = self.text.clean_brand(record.brand.as_deref());
        let canonical_name = product_name
            .as_deref()
            .map(|name| self.text.canonicalize(name, &brand))
            .unwrap_or_default();
        if canonical_name.is_empty() {
            warnings.push(NormalizationWarning::EmptyName);
        }

        let size_description = clean_text(record.size.as_deref());
        let unit_of_measure = clean_text(record.unit_of_measure.as_deref());
        let parsed_quantity = parse_quantity_with_unit(size_description.as_deref(), unit_of_measure.as_deref());
        if size_description.is_some() && parsed_quantity.is_none() {
            warnings.push(NormalizationWarning::UnparseableSize);
        }

        let price = match parse_price(clean_text(record.price.as_deref()).as_deref()) {
            PriceParse::Amount(amount) => Some(amount),
            PriceParse::Zero => {
                debug!(retailer = %record.retailer, index = source_index, "Zero price treated as unavailable");
                warnings.push(NormalizationWarning::ZeroPrice);
                None
            }
            PriceParse::Unparseable => {
                warnings.push(NormalizationWarning::UnparseablePrice);
                None
            }
            PriceParse::Missing => None,
        };

        let per_base_unit = match (price, parsed_quantity.as_ref()) {
            (Some(price), Some(quantity)) => price_per_base_unit(price, quantity),
            _ => None,
        };

        // Scraped and derived unit prices are never cross-checked
        let scraped_unit_price = parse_price(clean_text(record.price_per_unit.as_deref()).as_deref());
        let (price_per_unit, price_per_unit_source) = match scraped_unit_price {
            PriceParse::Amount(amount) => (Some(amount), Some(UnitPriceSource::Scraped)),
            other => {
                if other == PriceParse::Unparseable {
                    warnings.push(NormalizationWarning::UnparseableUnitPrice);
                }
                match per_base_unit {
                    Some(derived) => (Some(derived), Some(UnitPriceSource::Derived)),
                    None => (None, None),
                }
            }
        };

        let captured_at = clean_text(record.captured_at.as_deref()).and_then(|ts| {
            let parsed = parse_timestamp(&ts);
            if parsed.is_none() {
                warnings.push(NormalizationWarning::UnparseableTimestamp);
            }
            parsed
        });

        NormalizedProductRecord {
            source_index,
            product_name,
            canonical_name,
            brand,
            size_description,
            quantity: parsed_quantity.map(|q| q.quantity),
            base_unit: parsed_quantity.map(|q| q.base_unit),
            multipack_count: parsed_quantity.map(|q| q.multipack_count).unwrap_or(1),
            price,
            price_per_unit,
            price_per_unit_source,
            price_per_base_unit: per_base_unit,
            retailer: clean_text(Some(&record.retailer)).unwrap_or_default(),
            product_url: clean_text(record.product_url.as_deref()),
            category: clean_text(record.category.as_deref()),
            department: clean_text(record.department.as_deref()),
            captured_at,
            warnings,
        }
    }
}

/// Normalize a batch in parallel; output order matches input order.
pub fn normalize_batch(
    normalizer: &dyn ProductNormalizer,
    records: &[RawProductRecord],
) -> Vec<NormalizedProductRecord> {
    records
        .par_iter()
        .enumerate()
        .map(|(index, record)| normalizer.normalize(index, record))
        .collect()
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
