//! In-memory column store handed to a private table.

use std::collections::BTreeMap;

use dp_table_core::{DpError, Result, Value};

/// Named columns of equal length.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    columns: BTreeMap<String, Vec<Value>>,
    num_rows: usize,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. All columns must have the same number of rows.
    pub fn with_column<S, I, V>(mut self, name: S, values: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let name = name.into();
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if self.columns.contains_key(&name) {
            return Err(DpError::invalid(format!("duplicate column `{name}`")));
        }
        if !self.columns.is_empty() && values.len() != self.num_rows {
            return Err(DpError::invalid(format!(
                "column `{name}` has {} rows, expected {}",
                values.len(),
                self.num_rows
            )));
        }
        self.num_rows = values.len();
        self.columns.insert(name, values);
        Ok(self)
    }

    /// Values of a column, if present.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Whether a column is present.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in sorted order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_must_align() {
        let ds = Dataset::new()
            .with_column("Name", ["Tom", "Jack", "Steve", "Jack"])
            .unwrap();
        assert_eq!(ds.num_rows(), 4);
        assert!(ds.clone().with_column("Age", [28, 34]).is_err());

        let ds = ds.with_column("Age", [28, 34, 29, 42]).unwrap();
        assert_eq!(ds.column_names().collect::<Vec<_>>(), vec!["Age", "Name"]);
        assert_eq!(ds.column("Age").unwrap()[3], Value::Int(42));
        assert!(ds.column("Height").is_none());
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let ds = Dataset::new().with_column("Age", [1, 2]).unwrap();
        assert!(ds.with_column("Age", [3, 4]).is_err());
    }
}
