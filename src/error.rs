use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Match threshold must be within 0..=100, got {0}")]
    InvalidThreshold(f64),
}

pub type Result<T> = std::result::Result<T, CompareError>;
