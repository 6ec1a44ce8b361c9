// Observability: metric names and recording helpers

pub mod metrics;

pub use metrics::init;
