use std::collections::HashSet;

use crate::tabular::TabularInput;

/// The ordered, grow-only set of CSV columns.
///
/// Column order is the order names were first added. There is no way to
/// remove a column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
    names: HashSet<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schema from pre-declared columns. Duplicates are dropped.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Schema::new();
        for column in columns {
            schema.insert(column.into());
        }
        schema
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Keys of `tabular` that are not columns yet, in record order.
    pub fn drift<'a>(&self, tabular: &'a TabularInput) -> Vec<&'a str> {
        tabular.keys().filter(|k| !self.contains(k)).collect()
    }

    /// Appends `names` that are not already columns. Returns how many were added.
    pub fn extend<'a, I>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|name| self.insert(name.to_string()))
            .count()
    }

    /// Renders one CSV row for `tabular`: one field per column, blank where
    /// the record has no value.
    pub fn row(&self, tabular: &TabularInput) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                tabular
                    .get(column)
                    .map(ToString::to_string)
                    .unwrap_or_default()
            })
            .collect()
    }

    fn insert(&mut self, name: String) -> bool {
        if self.names.contains(&name) {
            return false;
        }
        self.names.insert(name.clone());
        self.columns.push(name);
        true
    }
}
