//! CSV output module
//!
//! Writes tabular records to a CSV file whose header grows as new keys show up.

pub mod diagnostics;
pub mod schema;
pub mod writer;

pub use diagnostics::{drift_message, Diagnostics, WARNING_TARGET};
pub use schema::Schema;
pub use writer::CsvOutput;
