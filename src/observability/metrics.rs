//! Metrics for the price comparison pipeline
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed with [`init`].

use std::fmt;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::{CompareError, Result};

/// Every metric name the pipeline emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Normalize metrics
    NormalizeRecordsProcessed,
    NormalizeFieldWarnings,
    NormalizeZeroPrices,
    NormalizeDuration,

    // Matching metrics
    MatchingCandidateEdges,
    MatchingRetailerConflicts,
    MatchingRecordsEjected,
    MatchingClusters,
    MatchingDuration,

    // Comparison metrics
    ComparisonRowsEmitted,
    ComparisonRowsDropped,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::NormalizeRecordsProcessed => "price_compare_normalize_records_processed_total",
            MetricName::NormalizeFieldWarnings => "price_compare_normalize_field_warnings_total",
            MetricName::NormalizeZeroPrices => "price_compare_normalize_zero_prices_total",
            MetricName::NormalizeDuration => "price_compare_normalize_duration_seconds",

            MetricName::MatchingCandidateEdges => "price_compare_matching_candidate_edges_total",
            MetricName::MatchingRetailerConflicts => "price_compare_matching_retailer_conflicts_total",
            MetricName::MatchingRecordsEjected => "price_compare_matching_records_ejected_total",
            MetricName::MatchingClusters => "price_compare_matching_clusters_total",
            MetricName::MatchingDuration => "price_compare_matching_duration_seconds",

            MetricName::ComparisonRowsEmitted => "price_compare_comparison_rows_emitted_total",
            MetricName::ComparisonRowsDropped => "price_compare_comparison_rows_dropped_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            NormalizeRecordsProcessed,
            NormalizeFieldWarnings,
            NormalizeZeroPrices,
            NormalizeDuration,
            MatchingCandidateEdges,
            MatchingRetailerConflicts,
            MatchingRecordsEjected,
            MatchingClusters,
            MatchingDuration,
            ComparisonRowsEmitted,
            ComparisonRowsDropped,
        ]
        .into_iter()
    }

    /// (phase, description)
    pub fn metadata(&self) -> (&'static str, &'static str) {
        match self {
            MetricName::NormalizeRecordsProcessed => ("normalize", "Raw records normalized"),
            MetricName::NormalizeFieldWarnings => ("normalize", "Fields left absent because they did not parse"),
            MetricName::NormalizeZeroPrices => ("normalize", "Zero prices treated as unavailable"),
            MetricName::NormalizeDuration => ("normalize", "Time spent normalizing a batch"),
            MetricName::MatchingCandidateEdges => ("matching", "Cross-retailer pairs at or above the threshold"),
            MetricName::MatchingRetailerConflicts => ("matching", "Same-retailer collisions resolved while clustering"),
            MetricName::MatchingRecordsEjected => ("matching", "Records split off into singleton clusters"),
            MetricName::MatchingClusters => ("matching", "Clusters produced"),
            MetricName::MatchingDuration => ("matching", "Time spent scoring and clustering"),
            MetricName::ComparisonRowsEmitted => ("comparison", "Comparison rows written"),
            MetricName::ComparisonRowsDropped => ("comparison", "Clusters dropped for having a single retailer"),
        }
    }
}

/// Install the Prometheus recorder; the handle renders the exposition text
pub fn init() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| CompareError::Config(format!("Failed to install Prometheus recorder: {}", e)))?;
    info!("Metrics system initialized");
    Ok(handle)
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    pub fn records_processed(count: usize) {
        ::metrics::counter!(MetricName::NormalizeRecordsProcessed.as_str()).increment(count as u64);
    }

    /// Record unparsed fields of one kind, labelled by warning name
    pub fn field_warnings(field: &'static str, count: usize) {
        ::metrics::counter!(MetricName::NormalizeFieldWarnings.as_str(), "field" => field)
            .increment(count as u64);
    }

    pub fn zero_prices(count: usize) {
        ::metrics::counter!(MetricName::NormalizeZeroPrices.as_str()).increment(count as u64);
    }

    pub fn duration(seconds: f64) {
        ::metrics::histogram!(MetricName::NormalizeDuration.as_str()).record(seconds);
    }
}

// ============================================================================
// Matching Metrics
// ============================================================================

pub mod matching {
    use super::MetricName;

    pub fn candidate_edges(count: usize) {
        ::metrics::counter!(MetricName::MatchingCandidateEdges.as_str()).increment(count as u64);
    }

    pub fn retailer_conflicts(count: usize, policy: &'static str) {
        ::metrics::counter!(MetricName::MatchingRetailerConflicts.as_str(), "policy" => policy)
            .increment(count as u64);
    }

    pub fn records_ejected(count: usize) {
        ::metrics::counter!(MetricName::MatchingRecordsEjected.as_str()).increment(count as u64);
    }

    pub fn clusters(count: usize) {
        ::metrics::counter!(MetricName::MatchingClusters.as_str()).increment(count as u64);
    }

    pub fn duration(seconds: f64) {
        ::metrics::histogram!(MetricName::MatchingDuration.as_str()).record(seconds);
    }
}

// ============================================================================
// Comparison Metrics
// ============================================================================

pub mod comparison {
    use super::MetricName;

    pub fn rows_emitted(count: usize) {
        ::metrics::counter!(MetricName::ComparisonRowsEmitted.as_str()).increment(count as u64);
    }

    pub fn rows_dropped(count: usize) {
        ::metrics::counter!(MetricName::ComparisonRowsDropped.as_str()).increment(count as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("price_compare_")));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        normalize::records_processed(3);
        normalize::field_warnings("unparseable_price", 1);
        matching::retailer_conflicts(1, "connected_components");
        comparison::rows_emitted(2);
    }

    #[test]
    fn test_display_matches_as_str() {
        for metric in MetricName::all_metrics() {
            assert_eq!(metric.to_string(), metric.as_str());
            assert!(!metric.metadata().1.is_empty());
        }
    }
}
