//! Result rows
//!
//! A row is an ordered column-name to value mapping. Column order is the
//! engine's column order and is what table headers and CSV headers use.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::value::Value;

/// One record of a query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: IndexMap<String, Value>,
}

/// The rows produced by one query, in engine order
pub type RowSet = Vec<Row>;

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from (column, value) pairs in engine order.
    ///
    /// Duplicate column names are made unique with a `:n` suffix so that no
    /// engine column is silently lost.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut row = Self::new();
        for (name, value) in pairs {
            row.push(name, value);
        }
        row
    }

    /// Append a column at the end of the row
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if !self.columns.contains_key(&name) {
            self.columns.insert(name, value);
            return;
        }

        let mut n = 1;
        loop {
            let candidate = format!("{}:{}", name, n);
            if !self.columns.contains_key(&candidate) {
                self.columns.insert(candidate, value);
                return;
            }
            n += 1;
        }
    }

    /// Get a value by column name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Values in column order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.values()
    }

    /// (column, value) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_order_preserved() {
        let row = Row::from_pairs([
            ("zeta", Value::Integer(1)),
            ("alpha", Value::Integer(2)),
            ("mid", Value::Null),
        ]);
        let cols: Vec<&str> = row.columns().collect();
        assert_eq!(cols, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_columns_renamed() {
        let row = Row::from_pairs([
            ("a", Value::Integer(1)),
            ("a", Value::Integer(2)),
            ("a", Value::Integer(3)),
        ]);
        let cols: Vec<&str> = row.columns().collect();
        assert_eq!(cols, vec!["a", "a:1", "a:2"]);
        assert_eq!(row.get("a:2"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let row = Row::from_pairs([("id", Value::Integer(1)), ("name", Value::from("bob"))]);
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"id":1,"name":"bob"}"#
        );
    }
}
