// Pipeline processing: normalization, cross-retailer matching, comparison rows

pub mod comparison;
pub mod matching;
pub mod normalize;
