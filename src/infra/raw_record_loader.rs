use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::types::RawProductRecord;

/// Retailer name from a scrape file stem: `shoprite_raw_20240101` -> `Shoprite`
pub fn retailer_from_file_stem(stem: &str) -> String {
    let base = stem.split("_raw").next().unwrap_or(stem);
    let mut titled = String::with_capacity(base.len());
    let mut capitalize = true;
    for c in base.chars() {
        if c.is_alphabetic() {
            if capitalize {
                titled.extend(c.to_uppercase());
            } else {
                titled.extend(c.to_lowercase());
            }
            capitalize = false;
        } else {
            titled.push(c);
            capitalize = true;
        }
    }
    titled
}

/// Load one JSON array of raw records; records without a retailer take it from the file name
pub fn load_raw_file(path: &Path) -> Result<Vec<RawProductRecord>> {
    let content = fs::read_to_string(path)?;
    let mut records: Vec<RawProductRecord> = serde_json::from_str(&content)?;

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let retailer = retailer_from_file_stem(stem);
    for record in records.iter_mut().filter(|r| r.retailer.trim().is_empty()) {
        record.retailer = retailer.clone();
    }
    Ok(records)
}

/// Load every input file, expanding directories to their `*.json` files.
///
/// Files that fail to load are logged and skipped.
pub fn load_raw_inputs(inputs: &[PathBuf]) -> Vec<RawProductRecord> {
    let mut records = Vec::new();
    for path in expand_inputs(inputs) {
        match load_raw_file(&path) {
            Ok(loaded) => {
                info!("Loaded {} records from {}", loaded.len(), path.display());
                records.extend(loaded);
            }
            Err(e) => error!("Error loading {}: {}", path.display(), e),
        }
    }
    records
}

fn expand_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        match fs::read_dir(input) {
            Ok(entries) => {
                let mut found: Vec<PathBuf> = entries
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("json"))
                    .collect();
                found.sort();
                if found.is_empty() {
                    warn!("No JSON files found in {}", input.display());
                }
                files.extend(found);
            }
            Err(e) => error!("Error reading directory {}: {}", input.display(), e),
        }
    }
    files
}
