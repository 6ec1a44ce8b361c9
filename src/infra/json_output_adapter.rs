use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::ports::ComparisonOutputPort;
use crate::pipeline::processing::comparison::ComparisonTable;
use crate::pipeline::processing::normalize::NormalizedProductRecord;

/// File-based implementation of ComparisonOutputPort writing pretty JSON
pub struct JsonFileOutput {
    table_path: PathBuf,
    normalized_path: Option<PathBuf>,
}

impl JsonFileOutput {
    pub fn new(table_path: impl Into<PathBuf>) -> Self {
        Self {
            table_path: table_path.into(),
            normalized_path: None,
        }
    }

    /// Also write every normalized record to `path`
    pub fn with_normalized_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.normalized_path = Some(path.into());
        self
    }
}

/// Write `value` as pretty JSON, creating parent directories
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

impl ComparisonOutputPort for JsonFileOutput {
    fn write_table(&self, table: &ComparisonTable) -> Result<()> {
        write_json(&self.table_path, table)?;
        info!("Wrote {} comparison rows to {}", table.rows.len(), self.table_path.display());
        Ok(())
    }

    fn write_normalized(&self, records: &[NormalizedProductRecord]) -> Result<()> {
        let Some(path) = &self.normalized_path else {
            return Ok(());
        };
        write_json(path, records)?;
        info!("Wrote {} normalized records to {}", records.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::comparison::ComparisonTableBuilder;

    #[test]
    fn test_writes_table_and_optional_normalized_file() {
        let dir = tempfile::tempdir().unwrap();
        let table_path = dir.path().join("out/comparison.json");
        let normalized_path = dir.path().join("out/normalized.json");

        let output = JsonFileOutput::new(&table_path).with_normalized_output(&normalized_path);
        let table = ComparisonTableBuilder::new(vec!["Shoprite".to_string()]).build(&[]);
        output.write_table(&table).unwrap();
        output.write_normalized(&[]).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&table_path).unwrap()).unwrap();
        assert_eq!(written["retailers"][0], "Shoprite");
        assert_eq!(written["rows"].as_array().map(Vec::len), Some(0));
        assert_eq!(fs::read_to_string(&normalized_path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_normalized_output_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let output = JsonFileOutput::new(dir.path().join("comparison.json"));
        output.write_normalized(&[]).unwrap();
        assert!(!dir.path().join("normalized.json").exists());
    }
}
