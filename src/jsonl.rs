//! JSON Lines input
//!
//! Turns a JSON Lines stream into log inputs: an object line is a tabular
//! record (key order preserved), a string line is a text message, and blank
//! lines are skipped.
//!
//! ```text
//! {"itr": 0, "loss": 50.0}
//! "Running training step"
//! {"itr": 1, "loss": 33.3, "new_data": 1}
//! ```

use std::fmt;
use std::io::BufRead;

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::TablogError;
use crate::input::{LogInput, LogOutput};
use crate::tabular::{TabularInput, Value};

/// Target used for text messages, which the CSV output does not accept.
pub const TEXT_TARGET: &str = "tablog::text";

/// One parsed JSON Lines entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Tabular(TabularInput),
    Text(String),
}

impl Line {
    pub fn as_input(&self) -> LogInput<'_> {
        match self {
            Line::Tabular(tabular) => LogInput::Tabular(tabular),
            Line::Text(text) => LogInput::Text(text),
        }
    }
}

/// Counters collected while feeding a stream into an output.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedStats {
    /// Tabular records handed to the output.
    pub records: u64,
    /// Text messages logged.
    pub messages: u64,
    /// Blank lines skipped.
    pub blank_lines: u64,
}

impl fmt::Display for FeedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} messages, {} blank lines",
            self.records, self.messages, self.blank_lines
        )
    }
}

/// Parses one line. Returns `None` for blank lines.
///
/// `line_number` is 1-indexed and only used in error messages.
pub fn parse_line(line: &str, line_number: u64) -> Result<Option<Line>, TablogError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<JsonValue>(trimmed)? {
        JsonValue::Object(map) => {
            let mut tabular = TabularInput::new();
            for (key, value) in map {
                let value = to_value(&value).ok_or_else(|| {
                    TablogError::InvalidArgument(format!(
                        "Line {}: field '{}' must be a number, string, or boolean",
                        line_number, key
                    ))
                })?;
                tabular.record(key, value);
            }
            Ok(Some(Line::Tabular(tabular)))
        }
        JsonValue::String(text) => Ok(Some(Line::Text(text))),
        _ => Err(TablogError::InvalidArgument(format!(
            "Line {}: expected a JSON object or string",
            line_number
        ))),
    }
}

fn to_value(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float)),
        JsonValue::String(s) => Some(Value::Str(s.clone())),
        _ => None,
    }
}

/// Feeds every line of `reader` into `output`.
///
/// Inputs the output does not accept are logged through `tracing` instead.
/// The first error stops the feed.
pub fn feed<R: BufRead>(reader: R, output: &mut dyn LogOutput) -> Result<FeedStats, TablogError> {
    let mut stats = FeedStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line_number = index as u64 + 1;
        let Some(mut parsed) = parse_line(&line?, line_number)? else {
            stats.blank_lines += 1;
            continue;
        };

        let input = parsed.as_input();
        if !output.accepts(input.kind()) {
            if let LogInput::Text(text) = input {
                info!(target: TEXT_TARGET, "{}", text);
            }
            stats.messages += 1;
            continue;
        }

        let ack = output.record(input)?;
        if let Line::Tabular(tabular) = &mut parsed {
            tabular.acknowledge(&ack);
            debug!(
                line = line_number,
                unconsumed = tabular.unmarked_keys().count(),
                "recorded tabular line"
            );
        }
        stats.records += 1;
    }

    output.flush()?;
    Ok(stats)
}
