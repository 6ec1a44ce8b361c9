use crate::pipeline::processing::normalize::NormalizedProductRecord;

/// Pre-filter deciding which cross-retailer pairs are worth scoring.
///
/// Blocking only prunes candidate pairs. Clustering over the surviving
/// edges is unchanged.
pub trait BlockingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the pair should be scored at all
    fn may_match(&self, a: &NormalizedProductRecord, b: &NormalizedProductRecord) -> bool;
}

/// Scores every cross-retailer pair
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBlocking;

impl BlockingStrategy for NoBlocking {
    fn name(&self) -> &'static str {
        "none"
    }

    fn may_match(&self, _a: &NormalizedProductRecord, _b: &NormalizedProductRecord) -> bool {
        true
    }
}

/// Only scores pairs whose categories agree; a missing category matches anything
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryBlocking;

impl BlockingStrategy for CategoryBlocking {
    fn name(&self) -> &'static str {
        "category"
    }

    fn may_match(&self, a: &NormalizedProductRecord, b: &NormalizedProductRecord) -> bool {
        match (&a.category, &b.category) {
            (Some(ca), Some(cb)) => ca.eq_ignore_ascii_case(cb),
            _ => true,
        }
    }
}
