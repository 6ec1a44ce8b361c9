//! Comparison table: one row per cross-retailer product cluster.

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::pipeline::processing::matching::ProductCluster;
use crate::pipeline::processing::normalize::NormalizedProductRecord;

/// Marker written in place of any value a retailer does not provide
pub const NOT_AVAILABLE: &str = "not available";

/// A comparison cell: a value, or an explicit "not available"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability<T> {
    Available(T),
    NotAvailable,
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Availability::Available(value) => Some(value),
            Availability::NotAvailable => None,
        }
    }
}

impl<T> From<Option<T>> for Availability<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Availability::NotAvailable, Availability::Available)
    }
}

impl<T: fmt::Display> fmt::Display for Availability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available(value) => value.fmt(f),
            Availability::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl<T: Serialize> Serialize for Availability<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Availability::Available(value) => value.serialize(serializer),
            Availability::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

/// One retailer's column in a comparison row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetailerOffer {
    pub retailer: String,
    pub price: Availability<Decimal>,
    pub price_per_unit: Availability<Decimal>,
    pub product_url: Availability<String>,
}

impl RetailerOffer {
    fn from_member(retailer: &str, member: Option<&NormalizedProductRecord>) -> Self {
        match member {
            Some(m) => Self {
                retailer: retailer.to_string(),
                price: m.price.into(),
                price_per_unit: m.price_per_unit.into(),
                product_url: m.product_url.clone().into(),
            },
            None => Self {
                retailer: retailer.to_string(),
                price: Availability::NotAvailable,
                price_per_unit: Availability::NotAvailable,
                product_url: Availability::NotAvailable,
            },
        }
    }
}

/// One product offered by at least two retailers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Display name of the representative member
    pub product_name: String,
    pub canonical_name: String,
    pub brand: String,
    pub size: Option<String>,
    /// One entry per retailer in the table, in column order
    pub offers: Vec<RetailerOffer>,
    pub retailer_count: usize,
    #[serde(skip)]
    first_index: usize,
}

impl ComparisonRow {
    pub fn offer_for(&self, retailer: &str) -> Option<&RetailerOffer> {
        self.offers.iter().find(|o| o.retailer == retailer)
    }
}

/// Rows plus the retailer column order they were built with
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub retailers: Vec<String>,
    pub rows: Vec<ComparisonRow>,
    /// Clusters skipped because only one retailer carries the product
    pub dropped_single_retailer: usize,
}

/// Builds comparison rows from finished clusters
#[derive(Debug, Clone, Default)]
pub struct ComparisonTableBuilder {
    retailers: Vec<String>,
}

impl ComparisonTableBuilder {
    /// Explicit column order
    pub fn new(retailers: Vec<String>) -> Self {
        Self { retailers }
    }

    /// Columns for every retailer in the source data, in first-seen order
    pub fn from_records(records: &[NormalizedProductRecord]) -> Self {
        let mut seen = HashSet::new();
        let retailers = records
            .iter()
            .filter(|r| !r.retailer.is_empty() && seen.insert(r.retailer.as_str()))
            .map(|r| r.retailer.clone())
            .collect();
        Self { retailers }
    }

    pub fn retailers(&self) -> &[String] {
        &self.retailers
    }

    pub fn build(&self, clusters: &[ProductCluster]) -> ComparisonTable {
        let mut retailers = self.retailers.clone();
        for cluster in clusters {
            for retailer in cluster.retailers() {
                if !retailers.iter().any(|r| r == retailer) {
                    retailers.push(retailer.to_string());
                }
            }
        }

        let mut rows = Vec::new();
        let mut dropped_single_retailer = 0;
        for cluster in clusters {
            let retailer_count = cluster.retailer_count();
            if retailer_count < 2 {
                dropped_single_retailer += 1;
                continue;
            }
            if let Some(row) = build_row(cluster, &retailers, retailer_count) {
                rows.push(row);
            }
        }

        rows.sort_by(|a, b| {
            a.product_name
                .to_lowercase()
                .cmp(&b.product_name.to_lowercase())
                .then(a.first_index.cmp(&b.first_index))
        });

        ComparisonTable {
            retailers,
            rows,
            dropped_single_retailer,
        }
    }
}

/// Most complete member; ties go to the earliest input record
pub fn representative(cluster: &ProductCluster) -> Option<&NormalizedProductRecord> {
    cluster.members().iter().max_by(|a, b| {
        a.completeness()
            .cmp(&b.completeness())
            .then(b.source_index.cmp(&a.source_index))
    })
}

fn build_row(cluster: &ProductCluster, retailers: &[String], retailer_count: usize) -> Option<ComparisonRow> {
    let rep = representative(cluster)?;
    let offers = retailers
        .iter()
        .map(|retailer| RetailerOffer::from_member(retailer, cluster.member_for(retailer)))
        .collect();

    Some(ComparisonRow {
        product_name: rep.product_name.clone().unwrap_or_else(|| rep.canonical_text()),
        canonical_name: rep.canonical_text(),
        brand: rep.brand.clone(),
        size: rep.size_label(),
        offers,
        retailer_count,
        first_index: cluster.first_index().unwrap_or(rep.source_index),
    })
}

/// Per-retailer price statistics over a finished table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetailerSummary {
    pub retailer: String,
    /// Rows where this retailer has an available price
    pub priced_rows: usize,
    pub average_price: Option<Decimal>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub rows: usize,
    pub retailers: Vec<RetailerSummary>,
}

impl ComparisonSummary {
    pub fn from_table(table: &ComparisonTable) -> Self {
        let retailers = table
            .retailers
            .iter()
            .map(|retailer| {
                let prices: Vec<Decimal> = table
                    .rows
                    .iter()
                    .filter_map(|row| row.offer_for(retailer))
                    .filter_map(|offer| offer.price.as_option().copied())
                    .collect();
                // No average when the total does not fit in a Decimal
                let average_price = if prices.is_empty() {
                    None
                } else {
                    prices
                        .iter()
                        .try_fold(Decimal::ZERO, |total, price| total.checked_add(*price))
                        .and_then(|total| total.checked_div(Decimal::from(prices.len())))
                        .map(|average| average.round_dp(2))
                };
                RetailerSummary {
                    retailer: retailer.clone(),
                    priced_rows: prices.len(),
                    average_price,
                    min_price: prices.iter().min().copied(),
                    max_price: prices.iter().max().copied(),
                }
            })
            .collect();

        Self {
            rows: table.rows.len(),
            retailers,
        }
    }
}
