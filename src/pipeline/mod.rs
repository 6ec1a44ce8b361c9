// Price comparison pipeline: normalization, matching, and table building

pub mod processing;

pub use processing::{comparison, matching, normalize};
