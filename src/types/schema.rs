//! Table schemas: ordered lists of named, typed columns.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::value::DataType;

/// A single column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// The column name.
    pub name: String,
    /// The column type.
    pub dtype: DataType,
}

impl Column {
    /// Creates a new column.
    #[must_use]
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self { name: name.into(), dtype }
    }
}

/// An ordered list of named, typed columns.
///
/// A row's meaning is only well-defined alongside the schema it was read
/// against: every operator in the execution layer produces values in exactly
/// this column order.
#[derive(Debug, Clone)]
pub struct Schema {
    /// The columns in order.
    columns: Vec<Column>,
    /// Map from column name to index for fast lookup.
    name_to_index: HashMap<String, usize>,
}

impl Schema {
    /// Creates a new schema from column definitions.
    #[must_use]
    pub fn new(columns: Vec<Column>) -> Self {
        let name_to_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self { columns, name_to_index }
    }

    /// Creates an empty schema.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets the index for a column name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Gets the column at an index.
    #[must_use]
    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Creates a projection of this schema with only the given columns.
    ///
    /// Used to derive an index's key schema from its key column indices.
    /// Indices outside the schema are skipped.
    #[must_use]
    pub fn project(&self, indices: &[usize]) -> Self {
        let columns = indices
            .iter()
            .filter_map(|&i| self.columns.get(i).cloned())
            .collect();
        Self::new(columns)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}

/// Convenience constructor for an `Arc<Schema>` from (name, type) pairs.
#[must_use]
pub fn schema_of(columns: &[(&str, DataType)]) -> Arc<Schema> {
    Arc::new(Schema::new(
        columns.iter().map(|(n, t)| Column::new(*n, *t)).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let schema = schema_of(&[("id", DataType::Int), ("name", DataType::String)]);
        assert_eq!(schema.column_count(), 2);
        assert_eq!(schema.index_of("id"), Some(0));
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(schema.index_of("missing"), None);
    }

    #[test]
    fn projection_preserves_order() {
        let schema = schema_of(&[
            ("a", DataType::Int),
            ("b", DataType::String),
            ("c", DataType::Float),
        ]);
        let key = schema.project(&[2, 0]);
        assert_eq!(key.column_count(), 2);
        assert_eq!(key.column_at(0).unwrap().name, "c");
        assert_eq!(key.column_at(1).unwrap().name, "a");
    }
}
