pub mod compare_use_case;
pub mod ports;

pub use compare_use_case::{ComparisonRun, ComparisonUseCase};
