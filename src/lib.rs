pub mod config;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod types;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;

pub use app::{ComparisonRun, ComparisonUseCase};
pub use config::Config;
pub use error::{CompareError, Result};
pub use types::RawProductRecord;
