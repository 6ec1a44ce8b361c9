use crate::pipeline::processing::comparison::ComparisonTable;
use crate::pipeline::processing::normalize::NormalizedProductRecord;

/// Export seam for finished comparison results
pub trait ComparisonOutputPort: Send + Sync {
    fn write_table(&self, table: &ComparisonTable) -> anyhow::Result<()>;

    /// Diagnostic export of every normalized record; ignored by default
    fn write_normalized(&self, _records: &[NormalizedProductRecord]) -> anyhow::Result<()> {
        Ok(())
    }
}
