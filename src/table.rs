//! In-memory tabular model
//!
//! A [`Table`] is an ordered list of [`Record`]s plus the union of their field
//! names in first-seen order. Records from different listing responses may
//! carry different fields; a missing field reads as null.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;

/// Ordered mapping of field name to scalar value
pub type Record = IndexMap<String, Value>;

/// Rows sharing a column set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    known: HashSet<String>,
    rows: Vec<Record>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table with a fixed header
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for column in columns {
            table.register(column.into());
        }
        table
    }

    /// Build a table from records, deriving columns from their keys
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.push(record);
        }
        table
    }

    /// Append a record, registering any field not seen before
    pub fn push(&mut self, record: Record) {
        for key in record.keys() {
            if !self.known.contains(key) {
                self.register(key.clone());
            }
        }
        self.rows.push(record);
    }

    fn register(&mut self, column: String) {
        if self.known.insert(column.clone()) {
            self.columns.push(column);
        }
    }

    /// Append every row of `other`, preserving row order
    pub fn append(&mut self, other: Table) {
        for record in other.rows {
            self.push(record);
        }
    }

    /// Column names in first-seen order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at (`row`, `column`), `None` when either is absent
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Values of `column` across all rows (`Value::Null` where missing)
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&Value::Null))
    }
}

/// Render a cell for text output
///
/// Null becomes the empty string, strings are written verbatim and nested
/// values are JSON-encoded.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
