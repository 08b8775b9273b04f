//! CLI argument parsing module
//!
//! Handles command-line argument parsing using `clap` derive macros. The
//! `Args` struct holds every option; `validate()` checks the combinations and
//! `output_config()` resolves them into a [`CsvOutputConfig`].

use clap::Parser;
use std::path::PathBuf;

use crate::config::CsvOutputConfig;
use crate::error::TablogError;

/// Command-line arguments for tablog.
///
/// # Example
///
/// ```rust,ignore
/// use clap::Parser;
/// use tablog::cli::Args;
///
/// let args = Args::parse();
/// args.validate()?;
/// ```
#[derive(Parser, Debug)]
#[command(name = "tablog")]
#[command(about = "Write JSON Lines records to a CSV file whose columns grow with the data")]
#[command(version)]
pub struct Args {
    /// CSV file to write (required unless --config is given)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// JSON Lines input file (default: stdin)
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// JSON file describing the CSV output
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Columns the header starts with, comma separated
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Do not report schema growth
    #[arg(long, default_value = "false")]
    pub no_warnings: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate argument combinations.
    ///
    /// - Exactly one of `--file` and `--config` is required
    /// - `--columns` cannot be combined with `--config`
    /// - Column names must not be empty
    pub fn validate(&self) -> Result<(), String> {
        match (&self.file, &self.config) {
            (None, None) => return Err("--file or --config is required".to_string()),
            (Some(_), Some(_)) => {
                return Err("--file cannot be used with --config".to_string());
            }
            _ => {}
        }

        if self.config.is_some() && !self.columns.is_empty() {
            return Err("--columns cannot be used with --config".to_string());
        }

        if self.columns.iter().any(|c| c.is_empty()) {
            return Err("--columns must not contain empty names".to_string());
        }

        Ok(())
    }

    /// Resolves the CSV output configuration, reading `--config` if given.
    ///
    /// `--no-warnings` applies on top of a configuration file.
    pub fn output_config(&self) -> Result<CsvOutputConfig, TablogError> {
        let mut config = match (&self.config, &self.file) {
            (Some(path), _) => CsvOutputConfig::from_json_file(path)?,
            (None, Some(file)) => {
                let mut config = CsvOutputConfig::new(file.clone());
                config.columns = self.columns.clone();
                config
            }
            (None, None) => {
                return Err(TablogError::InvalidArgument(
                    "--file or --config is required".to_string(),
                ));
            }
        };

        if self.no_warnings {
            config.warnings = false;
        }
        Ok(config)
    }
}
