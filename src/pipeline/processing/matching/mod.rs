//! Cross-retailer product matching.
//!
//! Pairs of records from different retailers are scored on their canonical
//! names; pairs at or above the threshold become candidate edges, and a
//! [`ClusterPolicy`] turns the edges into product clusters.

pub mod blocking;
pub mod cluster;
pub mod similarity;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::{CompareError, Result};
use crate::pipeline::processing::normalize::NormalizedProductRecord;
use blocking::{BlockingStrategy, CategoryBlocking, NoBlocking};
use cluster::{ClusterPolicy, ClusteringReport, ConnectedComponents, MatchEdge, StrictPairwise};
use similarity::{SimilarityMetric, TokenSortLevenshtein, TokenSortRatio};

/// Minimum similarity for two listings to count as the same product
pub const DEFAULT_MATCH_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    #[default]
    TokenSortRatio,
    TokenSortLevenshtein,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPolicyKind {
    #[default]
    ConnectedComponents,
    StrictPairwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingKind {
    #[default]
    None,
    Category,
}

/// Configuration for the matching stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Similarity threshold on a 0..=100 scale
    pub threshold: f64,
    pub metric: MetricKind,
    pub cluster_policy: ClusterPolicyKind,
    pub blocking: BlockingKind,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            metric: MetricKind::default(),
            cluster_policy: ClusterPolicyKind::default(),
            blocking: BlockingKind::default(),
        }
    }
}

impl MatchingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(CompareError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// Records judged to be the same product, at most one per retailer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCluster {
    members: Vec<NormalizedProductRecord>,
}

impl ProductCluster {
    /// Members are kept in input order
    pub fn new(mut members: Vec<NormalizedProductRecord>) -> Self {
        members.sort_by_key(|m| m.source_index);
        Self { members }
    }

    pub fn members(&self) -> &[NormalizedProductRecord] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn retailers(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.retailer.as_str()).collect()
    }

    /// Number of distinct retailers among the members
    pub fn retailer_count(&self) -> usize {
        self.members
            .iter()
            .map(|m| m.retailer.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn member_for(&self, retailer: &str) -> Option<&NormalizedProductRecord> {
        self.members.iter().find(|m| m.retailer == retailer)
    }

    /// Smallest input index among the members
    pub fn first_index(&self) -> Option<usize> {
        self.members.first().map(|m| m.source_index)
    }
}

/// Result of one matching run
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub clusters: Vec<ProductCluster>,
    pub edges: Vec<MatchEdge>,
    pub report: ClusteringReport,
}

/// Scores cross-retailer pairs and clusters the matches
pub struct MatchingEngine {
    threshold: f64,
    metric: Box<dyn SimilarityMetric>,
    policy: Box<dyn ClusterPolicy>,
    blocking: Box<dyn BlockingStrategy>,
}

impl MatchingEngine {
    pub fn new(config: &MatchingConfig) -> Self {
        let metric: Box<dyn SimilarityMetric> = match config.metric {
            MetricKind::TokenSortRatio => Box::new(TokenSortRatio),
            MetricKind::TokenSortLevenshtein => Box::new(TokenSortLevenshtein),
        };
        let policy: Box<dyn ClusterPolicy> = match config.cluster_policy {
            ClusterPolicyKind::ConnectedComponents => Box::new(ConnectedComponents),
            ClusterPolicyKind::StrictPairwise => Box::new(StrictPairwise),
        };
        let blocking: Box<dyn BlockingStrategy> = match config.blocking {
            BlockingKind::None => Box::new(NoBlocking),
            BlockingKind::Category => Box::new(CategoryBlocking),
        };
        Self::with_parts(config.threshold, metric, policy, blocking)
    }

    pub fn with_parts(
        threshold: f64,
        metric: Box<dyn SimilarityMetric>,
        policy: Box<dyn ClusterPolicy>,
        blocking: Box<dyn BlockingStrategy>,
    ) -> Self {
        Self {
            threshold,
            metric,
            policy,
            blocking,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// All cross-retailer pairs scoring at or above the threshold, ordered by (a, b)
    pub fn candidate_edges(&self, records: &[NormalizedProductRecord]) -> Vec<MatchEdge> {
        let keys: Vec<String> = records
            .par_iter()
            .map(|r| self.metric.key(&r.canonical_name))
            .collect();
        let keys = &keys;

        (0..records.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                ((i + 1)..records.len()).filter_map(move |j| {
                    let (a, b) = (&records[i], &records[j]);
                    if a.retailer == b.retailer || !self.blocking.may_match(a, b) {
                        return None;
                    }
                    let score = self.metric.compare(&keys[i], &keys[j]);
                    (score >= self.threshold).then(|| MatchEdge::new(i, j, score))
                })
            })
            .collect()
    }

    /// Score, link and cluster a normalized batch
    pub fn match_records(&self, records: &[NormalizedProductRecord]) -> MatchOutcome {
        let edges = self.candidate_edges(records);
        for edge in &edges {
            debug!(
                a = %records[edge.a].canonical_text(),
                b = %records[edge.b].canonical_text(),
                score = edge.score,
                "Matched"
            );
        }

        let retailers: Vec<&str> = records.iter().map(|r| r.retailer.as_str()).collect();
        let assignment = self.policy.assign(&retailers, &edges);

        if assignment.report.retailer_conflicts > 0 {
            warn!(
                conflicts = assignment.report.retailer_conflicts,
                ejected = assignment.report.ejected.len(),
                policy = self.policy.name(),
                "Resolved same-retailer conflicts while clustering"
            );
        }

        let clusters: Vec<ProductCluster> = assignment
            .groups
            .iter()
            .map(|group| ProductCluster::new(group.iter().map(|&i| records[i].clone()).collect()))
            .collect();

        info!(
            records = records.len(),
            edges = edges.len(),
            clusters = clusters.len(),
            metric = self.metric.name(),
            policy = self.policy.name(),
            blocking = self.blocking.name(),
            threshold = self.threshold,
            "Matching complete"
        );

        MatchOutcome {
            clusters,
            edges,
            report: assignment.report,
        }
    }
}
