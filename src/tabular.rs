//! Tabular record types.
//!
//! Defines [`Value`] (a primitive that renders as CSV text), [`TabularInput`]
//! (the ordered key/value container callers fill each logging step), and
//! [`Acknowledgement`] (the set of keys a sink has consumed).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A primitive value that can be logged in a tabular record.
///
/// Values are written verbatim through their [`Display`](fmt::Display)
/// rendering; sinks never validate types.
///
/// # Example
///
/// ```
/// use tablog::tabular::Value;
///
/// assert_eq!(Value::from(100.0 / 2.0).to_string(), "50.0");
/// assert_eq!(Value::from(3).to_string(), "3");
/// assert_eq!(Value::from(true).to_string(), "true");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_finite() && *x != 0.0 && !(1e-4..1e16).contains(&x.abs()) => {
                write_exponent(f, *x)
            }
            // Integral floats keep a trailing ".0" so 50.0 is not confused with 50
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
        }
    }
}

/// Writes `x` as `<mantissa>e<sign><exponent>` with at least two exponent
/// digits, e.g. `1e+300` or `2.5e-07`.
fn write_exponent(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    let text = format!("{:e}", x);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            write!(f, "{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => f.write_str(&text),
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

/// One entry of a [`TabularInput`].
#[derive(Debug, Clone, PartialEq)]
struct Entry {
    key: String,
    value: Value,
    marked: bool,
}

/// An ordered mapping from field name to [`Value`] for one logging step.
///
/// Keys keep the position of their first `record` call; recording an existing
/// key replaces its value in place and clears its consumed mark.
///
/// # Example
///
/// ```
/// use tablog::tabular::TabularInput;
///
/// let mut tabular = TabularInput::new();
/// tabular.record("itr", 0);
/// tabular.record("loss", 50.0);
///
/// assert_eq!(tabular.keys().collect::<Vec<_>>(), vec!["itr", "loss"]);
/// assert_eq!(tabular.unmarked_keys().count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularInput {
    entries: Vec<Entry>,
}

impl TabularInput {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` under `key`.
    pub fn record(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.value = value;
                entry.marked = false;
            }
            None => self.entries.push(Entry {
                key,
                value,
                marked: false,
            }),
        }
    }

    /// Returns the value recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Field names in recording order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// `(key, value)` pairs in recording order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.value))
    }

    /// Marks `key` as consumed by an output. Unknown keys are ignored.
    pub fn mark(&mut self, key: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.marked = true;
        }
    }

    /// Marks every key listed in `ack` as consumed.
    pub fn acknowledge(&mut self, ack: &Acknowledgement) {
        for key in ack.keys() {
            self.mark(key);
        }
    }

    pub fn is_marked(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key && e.marked)
    }

    /// Keys no output has consumed yet.
    pub fn unmarked_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.marked)
            .map(|e| e.key.as_str())
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K, V> FromIterator<(K, V)> for TabularInput
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tabular = TabularInput::new();
        for (key, value) in iter {
            tabular.record(key, value);
        }
        tabular
    }
}

/// The keys an output consumed from a [`TabularInput`] during one `record`.
///
/// Returned by the output instead of mutating the caller's record; apply it
/// with [`TabularInput::acknowledge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acknowledgement {
    keys: Vec<String>,
}

impl Acknowledgement {
    /// An acknowledgement that consumed nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Acknowledges every key of `tabular`.
    pub fn all(tabular: &TabularInput) -> Self {
        Self {
            keys: tabular.keys().map(str::to_string).collect(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
