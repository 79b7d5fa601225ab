//! The catalog: table and index metadata.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::heap::TableHeap;
use super::index::{BTreeIndex, RowIndex};
use crate::types::{RowId, Schema, TableId};

/// Resolved binding of a table: schema, row store, and name.
///
/// Handed out as an `Arc`, so operators resolve it once at construction and
/// hold it read-only for their lifetime.
#[derive(Debug)]
pub struct TableInfo {
    /// The table id.
    pub id: TableId,
    /// The table name.
    pub name: String,
    /// The table schema.
    pub schema: Arc<Schema>,
    /// The table's row store.
    pub heap: Arc<TableHeap>,
}

/// Descriptor of one secondary index on a table.
#[derive(Clone)]
pub struct IndexInfo {
    /// The index name.
    pub name: String,
    /// The indexed table's name.
    pub table: String,
    /// Indices of the key columns within the table schema.
    pub key_attrs: Vec<usize>,
    /// The key schema (projection of the table schema onto the key columns).
    pub key_schema: Arc<Schema>,
    /// The index structure itself.
    pub index: Arc<dyn RowIndex>,
}

impl std::fmt::Debug for IndexInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexInfo")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("key_attrs", &self.key_attrs)
            .finish_non_exhaustive()
    }
}

/// Table and index metadata for one database.
///
/// The catalog resolves a table identifier to its [`TableInfo`] and
/// enumerates the secondary indexes registered on a table. Creation
/// operations are for embedding code and tests; the execution layer only
/// reads.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Tables by name.
    tables: RwLock<HashMap<String, Arc<TableInfo>>>,
    /// Tables by id, for undo-record resolution.
    tables_by_id: RwLock<HashMap<TableId, Arc<TableInfo>>>,
    /// Secondary indexes grouped by table name.
    indexes: RwLock<HashMap<String, Vec<IndexInfo>>>,
    /// Next table id to issue.
    next_table_id: AtomicU32,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table and returns its resolved handle.
    ///
    /// Returns `None` if a table with this name already exists.
    pub fn create_table(&self, name: impl Into<String>, schema: Arc<Schema>) -> Option<Arc<TableInfo>> {
        let name = name.into();
        let mut tables = self.tables.write();
        if tables.contains_key(&name) {
            return None;
        }

        let id = TableId::new(self.next_table_id.fetch_add(1, Ordering::Relaxed));
        let info = Arc::new(TableInfo {
            id,
            name: name.clone(),
            schema,
            heap: Arc::new(TableHeap::new(id)),
        });
        tables.insert(name, Arc::clone(&info));
        self.tables_by_id.write().insert(id, Arc::clone(&info));
        Some(info)
    }

    /// Resolves a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<Arc<TableInfo>> {
        self.tables.read().get(name).cloned()
    }

    /// Resolves a table by id.
    #[must_use]
    pub fn table_by_id(&self, id: TableId) -> Option<Arc<TableInfo>> {
        self.tables_by_id.read().get(&id).cloned()
    }

    /// Creates a secondary index on `table` keyed on the given column
    /// indices, backfilling entries for rows already in the heap.
    ///
    /// Returns `None` if the table does not exist or a key column index is
    /// out of range.
    pub fn create_index(
        &self,
        name: impl Into<String>,
        table: &str,
        key_attrs: Vec<usize>,
    ) -> Option<IndexInfo> {
        let info = self.table(table)?;
        if key_attrs.iter().any(|&i| i >= info.schema.column_count()) {
            return None;
        }

        let index: Arc<dyn RowIndex> = Arc::new(BTreeIndex::new());
        for rid in info.heap.scan() {
            if let Some(row) = info.heap.get(rid) {
                index.insert(&row.project(&key_attrs), rid);
            }
        }

        let descriptor = IndexInfo {
            name: name.into(),
            table: table.to_string(),
            key_schema: Arc::new(info.schema.project(&key_attrs)),
            key_attrs,
            index,
        };
        self.indexes
            .write()
            .entry(table.to_string())
            .or_default()
            .push(descriptor.clone());
        Some(descriptor)
    }

    /// Enumerates the secondary indexes registered on `table`.
    #[must_use]
    pub fn table_indexes(&self, table: &str) -> Vec<IndexInfo> {
        self.indexes
            .read()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Restores a row slot during rollback; no-op if the table is unknown.
    pub(crate) fn revert_row(&self, table: TableId, rid: RowId, row: crate::exec::Row) {
        if let Some(info) = self.table_by_id(table) {
            info.heap.revert(rid, row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::Row;
    use crate::types::{schema_of, DataType, Value};

    fn sample_catalog() -> (Catalog, Arc<TableInfo>) {
        let catalog = Catalog::new();
        let schema = schema_of(&[("id", DataType::Int), ("balance", DataType::Int)]);
        let info = catalog.create_table("accounts", schema).unwrap();
        (catalog, info)
    }

    #[test]
    fn create_and_resolve() {
        let (catalog, info) = sample_catalog();
        let resolved = catalog.table("accounts").unwrap();
        assert_eq!(resolved.id, info.id);
        assert!(catalog.table("missing").is_none());
        assert!(catalog.table_by_id(info.id).is_some());
    }

    #[test]
    fn duplicate_table_names_are_rejected() {
        let (catalog, _) = sample_catalog();
        let schema = schema_of(&[("x", DataType::Int)]);
        assert!(catalog.create_table("accounts", schema).is_none());
    }

    #[test]
    fn create_index_backfills_existing_rows() {
        let (catalog, info) = sample_catalog();
        let rid = info.heap.insert(Row::new(
            Arc::clone(&info.schema),
            vec![Value::Int(1), Value::Int(100)],
        ));

        let index = catalog.create_index("accounts_pk", "accounts", vec![0]).unwrap();
        assert_eq!(index.index.get(&[Value::Int(1)]), vec![rid]);
        assert_eq!(index.key_schema.column_at(0).unwrap().name, "id");
    }

    #[test]
    fn index_on_unknown_column_is_rejected() {
        let (catalog, _) = sample_catalog();
        assert!(catalog.create_index("bad", "accounts", vec![5]).is_none());
        assert!(catalog.create_index("bad", "missing", vec![0]).is_none());
    }

    #[test]
    fn table_indexes_enumeration() {
        let (catalog, _) = sample_catalog();
        assert!(catalog.table_indexes("accounts").is_empty());
        catalog.create_index("a", "accounts", vec![0]).unwrap();
        catalog.create_index("b", "accounts", vec![1]).unwrap();
        let names: Vec<_> = catalog
            .table_indexes("accounts")
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
