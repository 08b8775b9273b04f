use csv::{ReaderBuilder, StringRecord, Writer};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use super::diagnostics::{drift_message, Diagnostics};
use super::schema::Schema;
use crate::config::CsvOutputConfig;
use crate::error::TablogError;
use crate::input::{InputKind, LogInput, LogOutput};
use crate::tabular::{Acknowledgement, TabularInput};

/// CSV output whose columns grow with the records it is given.
///
/// The `CsvOutput` writes each [`TabularInput`] as one CSV row. The header is
/// the union of every key seen so far; when a record brings a key the header
/// does not have yet, the file is rewritten under the larger header before the
/// row is appended, so earlier rows gain a blank cell for the new column.
///
/// # Behaviour
///
/// - An empty record before anything was written is ignored entirely
/// - Keys absent from a record are written as empty cells
/// - Existing columns never move; new columns are appended in the order the
///   record introduced them
/// - Growing the header rewrites the whole file into a temporary file that is
///   then renamed over the target, so a crash leaves either the old or the
///   new file, never a mix
/// - Each distinct growth is reported once through [`Diagnostics`]
///
/// # CSV Format
///
/// RFC 4180 as produced by the csv crate: fields containing commas, double
/// quotes, or newlines are quoted and escaped.
///
/// # Example
///
/// ```no_run
/// use tablog::csv_output::CsvOutput;
/// use tablog::input::LogInput;
/// use tablog::tabular::TabularInput;
/// use std::path::Path;
///
/// let mut output = CsvOutput::new(Path::new("progress.csv")).unwrap();
/// let mut tabular = TabularInput::new();
/// tabular.record("itr", 0);
/// tabular.record("loss", 50.0);
///
/// let ack = output.record(LogInput::Tabular(&tabular)).unwrap();
/// tabular.acknowledge(&ack);
/// output.close().unwrap();
/// ```
pub struct CsvOutput {
    /// Path of the output file, needed to re-read and replace it.
    path: PathBuf,
    /// Append target. `None` once closed.
    writer: Option<Writer<File>>,
    /// Columns of the header currently on disk (or to be written first).
    schema: Schema,
    /// Whether the header row has been written.
    header_written: bool,
    /// Drift warnings already reported by this output.
    diagnostics: Diagnostics,
}

impl CsvOutput {
    /// Creates a CSV output, truncating `path`. Nothing is written until the
    /// first non-empty record.
    pub fn new(path: &Path) -> Result<Self, TablogError> {
        Self::with_schema(path, Schema::new())
    }

    /// Creates a CSV output whose header starts with pre-declared columns.
    ///
    /// Records that only use these columns never cause the file to be
    /// rewritten.
    pub fn with_schema(path: &Path, schema: Schema) -> Result<Self, TablogError> {
        let writer = Writer::from_path(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            schema,
            header_written: false,
            diagnostics: Diagnostics::new(),
        })
    }

    /// Creates a CSV output from its configuration section.
    pub fn from_config(config: &CsvOutputConfig) -> Result<Self, TablogError> {
        let schema = Schema::with_columns(&config.columns);
        let mut output = Self::with_schema(&config.path, schema)?;
        if !config.warnings {
            output.disable_warnings();
        }
        Ok(output)
    }

    /// Writes one record as a row, growing the header first if needed.
    ///
    /// Returns the keys of the record that were written, for the caller to
    /// [acknowledge](TabularInput::acknowledge) on its record.
    pub fn record(&mut self, input: LogInput<'_>) -> Result<Acknowledgement, TablogError> {
        let tabular = match input {
            LogInput::Tabular(tabular) => tabular,
            other => return Err(TablogError::InvalidInputKind(other.kind())),
        };
        if self.writer.is_none() {
            return Err(TablogError::Closed);
        }

        if tabular.is_empty() && !self.header_written {
            return Ok(Acknowledgement::empty());
        }

        let added = self.schema.drift(tabular);
        if !self.header_written {
            self.schema.extend(added);
            self.writer
                .as_mut()
                .ok_or(TablogError::Closed)?
                .write_record(self.schema.columns())?;
            self.header_written = true;
        } else if !added.is_empty() {
            self.migrate(&added)?;
        }

        self.write_row(tabular)?;
        Ok(Acknowledgement::all(tabular))
    }

    /// Flushes buffered rows to disk.
    pub fn flush(&mut self) -> Result<(), TablogError> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flushes and releases the file. Calling it again does nothing.
    pub fn close(&mut self) -> Result<(), TablogError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            debug!(path = %self.path.display(), "closed CSV output");
        }
        Ok(())
    }

    /// Stops emitting drift warnings. Used by test harnesses.
    pub fn disable_warnings(&mut self) {
        self.diagnostics.disable();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    fn writer_mut(&mut self) -> Result<&mut Writer<File>, TablogError> {
        self.writer.as_mut().ok_or(TablogError::Closed)
    }

    fn write_row(&mut self, tabular: &TabularInput) -> Result<(), TablogError> {
        let row = self.schema.row(tabular);
        self.writer_mut()?.write_record(&row)?;
        debug!(path = %self.path.display(), columns = row.len(), "appended CSV row");
        Ok(())
    }

    /// Rewrites the file under a header extended by `added`.
    fn migrate(&mut self, added: &[&str]) -> Result<(), TablogError> {
        self.writer_mut()?.flush()?;
        let rows = self.read_back()?;

        let mut grown = self.schema.clone();
        let padding = grown.extend(added.iter().copied());

        let mut rewriter = Writer::from_writer(NamedTempFile::new_in(self.parent_dir())?);
        rewriter.write_record(grown.columns())?;
        for row in &rows {
            rewriter.write_record(row.iter().chain(std::iter::repeat("").take(padding)))?;
        }
        let temp = rewriter.into_inner().map_err(|err| {
            let source = err.error();
            TablogError::Io(std::io::Error::new(source.kind(), source.to_string()))
        })?;
        let permissions = std::fs::metadata(&self.path)?.permissions();
        std::fs::set_permissions(temp.path(), permissions)?;

        // Release the old handle before the target is replaced
        self.writer = None;
        let file = match temp.persist(&self.path) {
            Ok(file) => file,
            Err(err) => {
                self.writer = Some(self.reopen_append()?);
                return Err(err.into());
            }
        };

        self.writer = Some(Writer::from_writer(file));
        self.schema = grown;
        debug!(
            path = %self.path.display(),
            rows = rows.len(),
            columns = self.schema.len(),
            "rewrote CSV output under a larger header"
        );
        self.diagnostics.warn_once(&drift_message(added));
        Ok(())
    }

    /// Reads back every data row, checking it against the recorded header.
    fn read_back(&self) -> Result<Vec<StringRecord>, TablogError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;

        // The reader drops a leading UTF-8 BOM from the first header field.
        let headers = reader.headers().map_err(corrupt)?;
        let expected = self.schema.columns().iter().enumerate().map(|(i, c)| {
            if i == 0 {
                c.strip_prefix('\u{feff}').unwrap_or(c.as_str())
            } else {
                c.as_str()
            }
        });
        if !headers.iter().eq(expected) {
            return Err(TablogError::CorruptState(format!(
                "{}: header {:?} does not match recorded columns {:?}",
                self.path.display(),
                headers.iter().collect::<Vec<_>>(),
                self.schema.columns()
            )));
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            rows.push(result.map_err(corrupt)?);
        }
        Ok(rows)
    }

    fn reopen_append(&self) -> Result<Writer<File>, TablogError> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        Ok(Writer::from_writer(file))
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// I/O failures pass through; anything else means the file no longer parses.
fn corrupt(err: csv::Error) -> TablogError {
    if err.is_io_error() {
        TablogError::Csv(err)
    } else {
        TablogError::CorruptState(err.to_string())
    }
}

impl LogOutput for CsvOutput {
    fn types_accepted(&self) -> &'static [InputKind] {
        &[InputKind::Tabular]
    }

    fn record(&mut self, input: LogInput<'_>) -> Result<Acknowledgement, TablogError> {
        CsvOutput::record(self, input)
    }

    fn flush(&mut self) -> Result<(), TablogError> {
        CsvOutput::flush(self)
    }

    fn close(&mut self) -> Result<(), TablogError> {
        CsvOutput::close(self)
    }
}

impl Drop for CsvOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
