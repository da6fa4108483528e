//! Table models: the in-memory raw table and the inferred schema

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::column::{Column, ColumnProfile};
use super::enums::StorageType;
use super::value::Value;

/// In-memory table read from a source file or a destination query
///
/// Rows are stored row-major in the same order as [`RawTable::columns`].
/// A raw table lives only for the duration of one file's processing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Column names, in source order
    pub columns: Vec<String>,
    /// Row-major cell storage
    pub rows: Vec<Vec<Value>>,
}

impl RawTable {
    /// Create a table from column names and rows
    ///
    /// Short rows are padded with [`Value::Null`]; long rows are truncated to
    /// the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Index of a column by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy out the values of one column
    pub fn column_values(&self, idx: usize) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Replace the values of one column
    ///
    /// `values` must have one entry per row; missing entries become null.
    pub fn replace_column(&mut self, idx: usize, values: Vec<Value>) {
        let mut values = values.into_iter();
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                *cell = values.next().unwrap_or(Value::Null);
            }
        }
    }

    /// Rename every column at once
    pub fn rename_columns(&mut self, names: Vec<String>) {
        debug_assert_eq!(names.len(), self.columns.len());
        self.columns = names;
    }

    /// Profile one column
    pub fn profile(&self, idx: usize) -> ColumnProfile {
        let name = self.columns.get(idx).cloned().unwrap_or_default();
        ColumnProfile::from_values(name, &self.column_values(idx))
    }

    /// Profile every column, in order
    pub fn profiles(&self) -> Vec<ColumnProfile> {
        (0..self.column_count()).map(|i| self.profile(i)).collect()
    }
}

/// Error raised when a schema would contain the same column name twice
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Duplicate column name in schema: {0}")]
pub struct DuplicateColumnError(pub String);

/// Ordered list of canonical column names with storage types
///
/// Column names are unique within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    columns: Vec<Column>,
}

impl InferredSchema {
    /// Build a schema, rejecting duplicate column names
    pub fn new(columns: Vec<Column>) -> Result<Self, DuplicateColumnError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DuplicateColumnError(column.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Storage type of a column by name
    pub fn storage_type(&self, name: &str) -> Option<StorageType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.storage_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> RawTable {
        RawTable::new(
            vec!["id".to_string(), "name".to_string()],
            vec![
                vec![Value::Integer(1), Value::from("Ada")],
                vec![Value::Integer(2)],
            ],
        )
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = sample_table();
        assert_eq!(table.rows[1], vec![Value::Integer(2), Value::Null]);
    }

    #[test]
    fn test_replace_column() {
        let mut table = sample_table();
        table.replace_column(1, vec![Value::from("A"), Value::from("B")]);
        assert_eq!(
            table.column_values(1),
            vec![Value::from("A"), Value::from("B")]
        );
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let err = InferredSchema::new(vec![
            Column::new("a", StorageType::Integer),
            Column::new("a", StorageType::Text),
        ])
        .unwrap_err();
        assert_eq!(err, DuplicateColumnError("a".to_string()));
    }

    #[test]
    fn test_schema_lookup() {
        let schema = InferredSchema::new(vec![Column::new("a", StorageType::Float)]).unwrap();
        assert_eq!(schema.storage_type("a"), Some(StorageType::Float));
        assert_eq!(schema.storage_type("b"), None);
        assert_eq!(schema.len(), 1);
    }
}
