//! Dataset writers.

pub mod csv;
pub mod json;

pub use self::csv::{write_dataset_csv, write_table_csv};
pub use self::json::write_dataset_json;
