use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::app::ports::ComparisonOutputPort;
use crate::config::Config;
use crate::observability::metrics;
use crate::pipeline::processing::comparison::{ComparisonSummary, ComparisonTable, ComparisonTableBuilder};
use crate::pipeline::processing::matching::cluster::ClusteringReport;
use crate::pipeline::processing::matching::MatchingEngine;
use crate::pipeline::processing::normalize::{
    normalize_batch, DefaultNormalizer, NormalizationWarning, NormalizedProductRecord, ProductNormalizer,
};
use crate::types::RawProductRecord;

/// Everything one pipeline run produced
#[derive(Debug, Clone)]
pub struct ComparisonRun {
    pub normalized: Vec<NormalizedProductRecord>,
    pub table: ComparisonTable,
    pub summary: ComparisonSummary,
    pub report: ClusteringReport,
    pub candidate_edges: usize,
    pub clusters: usize,
}

/// Use case running normalize → match → comparison table over a full data set
pub struct ComparisonUseCase {
    normalizer: Box<dyn ProductNormalizer>,
    engine: MatchingEngine,
    output_port: Option<Arc<dyn ComparisonOutputPort>>,
}

impl ComparisonUseCase {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        Ok(Self::with_parts(
            Box::new(DefaultNormalizer::with_config(&config.normalize)),
            MatchingEngine::new(&config.matching),
        ))
    }

    pub fn with_parts(normalizer: Box<dyn ProductNormalizer>, engine: MatchingEngine) -> Self {
        Self {
            normalizer,
            engine,
            output_port: None,
        }
    }

    pub fn with_output_port(mut self, output_port: Arc<dyn ComparisonOutputPort>) -> Self {
        self.output_port = Some(output_port);
        self
    }

    /// Normalize a batch, recording parse warnings
    pub fn normalize(&self, records: &[RawProductRecord]) -> Vec<NormalizedProductRecord> {
        let start_time = Instant::now();
        let normalized = normalize_batch(self.normalizer.as_ref(), records);

        let mut warnings: BTreeMap<&'static str, usize> = BTreeMap::new();
        for warning in normalized.iter().flat_map(|r| r.warnings.iter()) {
            *warnings.entry(warning.as_str()).or_default() += 1;
        }
        for (field, count) in &warnings {
            debug!(field, count, "Fields left absent after normalization");
            metrics::normalize::field_warnings(*field, *count);
        }
        let zero_prices = warnings
            .get(NormalizationWarning::ZeroPrice.as_str())
            .copied()
            .unwrap_or(0);
        metrics::normalize::zero_prices(zero_prices);
        metrics::normalize::records_processed(normalized.len());
        metrics::normalize::duration(start_time.elapsed().as_secs_f64());

        info!(
            records = normalized.len(),
            zero_prices,
            warnings = warnings.values().sum::<usize>(),
            "Normalization complete"
        );
        normalized
    }

    /// Run the full pipeline and hand the results to the output port
    pub fn run(&self, records: Vec<RawProductRecord>) -> Result<ComparisonRun> {
        info!("Starting comparison run over {} raw records", records.len());

        let normalized = self.normalize(&records);

        let start_time = Instant::now();
        let outcome = self.engine.match_records(&normalized);
        metrics::matching::duration(start_time.elapsed().as_secs_f64());
        metrics::matching::candidate_edges(outcome.edges.len());
        metrics::matching::clusters(outcome.clusters.len());
        if outcome.report.retailer_conflicts > 0 {
            metrics::matching::retailer_conflicts(outcome.report.retailer_conflicts, self.engine.policy_name());
            metrics::matching::records_ejected(outcome.report.ejected.len());
        }

        let table = ComparisonTableBuilder::from_records(&normalized).build(&outcome.clusters);
        metrics::comparison::rows_emitted(table.rows.len());
        metrics::comparison::rows_dropped(table.dropped_single_retailer);
        info!(
            rows = table.rows.len(),
            dropped_single_retailer = table.dropped_single_retailer,
            retailers = table.retailers.len(),
            "Comparison table built"
        );

        let summary = ComparisonSummary::from_table(&table);
        log_summary(&summary);

        if let Some(port) = &self.output_port {
            port.write_table(&table).context("Failed to write comparison table")?;
            port.write_normalized(&normalized)
                .context("Failed to write normalized records")?;
        }

        Ok(ComparisonRun {
            candidate_edges: outcome.edges.len(),
            clusters: outcome.clusters.len(),
            report: outcome.report,
            normalized,
            table,
            summary,
        })
    }
}

fn log_summary(summary: &ComparisonSummary) {
    info!("Products found in multiple stores: {}", summary.rows);
    for retailer in &summary.retailers {
        match (retailer.average_price, retailer.min_price, retailer.max_price) {
            (Some(avg), Some(min), Some(max)) => info!(
                retailer = %retailer.retailer,
                priced_rows = retailer.priced_rows,
                average = %avg,
                min = %min,
                max = %max,
                "Retailer price statistics"
            ),
            _ => info!(retailer = %retailer.retailer, "No priced rows for retailer"),
        }
    }
}
