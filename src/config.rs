use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{CompareError, Result};
use crate::logging::LoggingConfig;
use crate::pipeline::processing::matching::MatchingConfig;
use crate::pipeline::processing::normalize::NormalizeConfig;

/// Environment variable overriding `matching.threshold`
pub const THRESHOLD_ENV: &str = "PRICE_COMPARE_THRESHOLD";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matching: MatchingConfig,
    pub normalize: NormalizeConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CompareError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.matching.validate()
    }

    /// Apply `PRICE_COMPARE_THRESHOLD` if set
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(THRESHOLD_ENV) {
            self.set_threshold_from_str(&raw)?;
        }
        Ok(())
    }

    fn set_threshold_from_str(&mut self, raw: &str) -> Result<()> {
        let threshold: f64 = raw
            .trim()
            .parse()
            .map_err(|_| CompareError::Config(format!("{} is not a number: '{}'", THRESHOLD_ENV, raw)))?;
        debug!(threshold, "Match threshold overridden from environment");
        self.matching.threshold = threshold;
        self.matching.validate()
    }
}
