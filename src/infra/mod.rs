pub mod json_output_adapter;
pub mod raw_record_loader;

pub use json_output_adapter::{write_json, JsonFileOutput};
pub use raw_record_loader::{load_raw_file, load_raw_inputs, retailer_from_file_stem};
