//! Configuration module
//!
//! Loads the CSV output configuration from a JSON file or builds it from CLI
//! arguments.
//!
//! # Example
//!
//! ```rust,ignore
//! use tablog::config::CsvOutputConfig;
//! use std::path::Path;
//!
//! let config = CsvOutputConfig::from_json_file(Path::new("tablog.json"))?;
//! let output = tablog::csv_output::CsvOutput::from_config(&config)?;
//! ```

use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::TablogError;

fn default_warnings() -> bool {
    true
}

/// Configuration of one CSV output.
///
/// Expected JSON format:
/// ```json
/// {
///     "path": "progress.csv",
///     "columns": ["itr", "loss"],
///     "warnings": true
/// }
/// ```
///
/// `columns` and `warnings` are optional. Declaring every column up front
/// means the file is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CsvOutputConfig {
    /// Output CSV file.
    pub path: PathBuf,
    /// Columns the header starts with.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Whether schema growth is reported.
    #[serde(default = "default_warnings")]
    pub warnings: bool,
}

impl CsvOutputConfig {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            columns: Vec::new(),
            warnings: true,
        }
    }

    /// Reads the configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, is not valid JSON, or
    /// declares an empty column name.
    pub fn from_json_file(path: &Path) -> Result<Self, TablogError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: CsvOutputConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the declared columns.
    pub fn validate(&self) -> Result<(), TablogError> {
        if self.columns.iter().any(|c| c.is_empty()) {
            return Err(TablogError::InvalidArgument(
                "column names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
