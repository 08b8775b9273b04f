//! Log inputs and the output boundary.
//!
//! Everything a caller can log is a [`LogInput`]. Each output declares the
//! [`InputKind`]s it accepts through [`LogOutput::types_accepted`]; a
//! dispatcher routes an input only to outputs that accept its kind, and
//! outputs still reject anything else with
//! [`TablogError::InvalidInputKind`].

use std::fmt;

use crate::error::TablogError;
use crate::tabular::{Acknowledgement, TabularInput};

/// The closed set of input kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// A key/value record ([`TabularInput`]).
    Tabular,
    /// A free-text message.
    Text,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Tabular => f.write_str("tabular"),
            InputKind::Text => f.write_str("text"),
        }
    }
}

/// A single thing handed to the outputs.
#[derive(Debug, Clone, Copy)]
pub enum LogInput<'a> {
    Tabular(&'a TabularInput),
    Text(&'a str),
}

impl LogInput<'_> {
    pub fn kind(&self) -> InputKind {
        match self {
            LogInput::Tabular(_) => InputKind::Tabular,
            LogInput::Text(_) => InputKind::Text,
        }
    }
}

impl<'a> From<&'a TabularInput> for LogInput<'a> {
    fn from(tabular: &'a TabularInput) -> Self {
        LogInput::Tabular(tabular)
    }
}

impl<'a> From<&'a str> for LogInput<'a> {
    fn from(text: &'a str) -> Self {
        LogInput::Text(text)
    }
}

/// A sink that receives log inputs.
pub trait LogOutput {
    /// Input kinds this output handles.
    fn types_accepted(&self) -> &'static [InputKind];

    /// Returns true if `kind` is one of [`types_accepted`](Self::types_accepted).
    fn accepts(&self, kind: InputKind) -> bool {
        self.types_accepted().contains(&kind)
    }

    /// Consumes one input, returning the record keys it observed.
    fn record(&mut self, input: LogInput<'_>) -> Result<Acknowledgement, TablogError>;

    /// Pushes buffered output to its destination.
    fn flush(&mut self) -> Result<(), TablogError> {
        Ok(())
    }

    /// Flushes and releases resources. Must be idempotent.
    fn close(&mut self) -> Result<(), TablogError> {
        self.flush()
    }
}
