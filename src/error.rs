//! Error module
//!
//! Defines the crate-wide error type using `thiserror`. Schema drift is not an
//! error: it is reported through [`crate::csv_output::Diagnostics`] instead.

use thiserror::Error;

use crate::input::InputKind;

/// The main error type for tablog.
///
/// # Error Categories
///
/// - **Input errors**: a sink was handed an input kind it does not accept
/// - **State errors**: the output file no longer matches the writer's header,
///   or the writer was already closed
/// - **File I/O errors**: CSV reading/writing and general I/O failures
/// - **Configuration errors**: invalid arguments or configuration files
///
/// # Example
///
/// ```rust,ignore
/// use tablog::error::TablogError;
///
/// fn example() -> Result<(), TablogError> {
///     // Errors from underlying types are automatically converted
///     let file = std::fs::File::open("nonexistent.csv")?;
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum TablogError {
    /// The sink does not accept this kind of input.
    ///
    /// Raised before any I/O happens, so the sink's state is unchanged and the
    /// caller may keep using it.
    #[error("Unacceptable input kind: {0}")]
    InvalidInputKind(InputKind),

    /// The output file could not be re-read with the header the writer
    /// recorded.
    ///
    /// This only happens if the file was modified behind the writer's back.
    /// It is fatal for that writer; retrying would re-read the same file.
    #[error("Corrupt CSV state: {0}")]
    CorruptState(String),

    /// The writer was used after `close()`.
    #[error("CSV output is closed")]
    Closed,

    /// CSV file handling error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// General I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error, from configuration files or JSON Lines input.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid command-line argument or configuration value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<tempfile::PersistError> for TablogError {
    fn from(err: tempfile::PersistError) -> Self {
        TablogError::Io(err.error)
    }
}
