//! tablog library
//!
//! Tabular metrics logging. Callers fill a [`tabular::TabularInput`] each
//! step and hand it to outputs; the [`csv_output::CsvOutput`] persists the
//! records to a CSV file whose header grows as new keys appear, rewriting
//! earlier rows so the file stays well formed.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod input;
pub mod jsonl;
pub mod tabular;
