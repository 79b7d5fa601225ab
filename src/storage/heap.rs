//! In-memory slotted row store.

use parking_lot::RwLock;
use tracing::trace;

use crate::exec::Row;
use crate::txn::{Transaction, WriteKind, WriteRecord};
use crate::types::{RowId, TableId};

/// The row store for one table.
///
/// Rows live in slots; a slot index, once issued as a [`RowId`], is stable
/// for the lifetime of the heap (deleted slots stay vacant, they are never
/// reused). Each operation takes the slot table lock once, so single-row
/// reads and writes are atomic. The heap performs no concurrency control
/// beyond that: callers are expected to hold the appropriate row lock.
///
/// Mutations append an undo record to the acting transaction's write set so
/// the transaction manager can roll them back on abort.
#[derive(Debug)]
pub struct TableHeap {
    /// The table this heap belongs to; recorded into undo records.
    table_id: TableId,
    /// Slot table; `None` marks a deleted row.
    slots: RwLock<Vec<Option<Row>>>,
}

impl TableHeap {
    /// Creates an empty heap for the given table.
    #[must_use]
    pub fn new(table_id: TableId) -> Self {
        Self { table_id, slots: RwLock::new(Vec::new()) }
    }

    /// Returns the owning table's id.
    #[must_use]
    pub const fn table_id(&self) -> TableId {
        self.table_id
    }

    /// Appends a row and returns its stable identifier.
    pub fn insert(&self, row: Row) -> RowId {
        let mut slots = self.slots.write();
        let rid = RowId::new(slots.len() as u64);
        slots.push(Some(row));
        rid
    }

    /// Reads the row at `rid`, or `None` if the slot is vacant or unknown.
    #[must_use]
    pub fn get(&self, rid: RowId) -> Option<Row> {
        self.slots
            .read()
            .get(rid.as_u64() as usize)
            .and_then(Clone::clone)
    }

    /// Overwrites the row at `rid` within `txn`.
    ///
    /// Returns `false` if the slot is vacant or unknown — the caller's
    /// store-write failure. On success the previous contents are recorded
    /// in the transaction's write set.
    pub fn update(&self, row: Row, rid: RowId, txn: &Transaction) -> bool {
        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(rid.as_u64() as usize) else {
            return false;
        };
        let Some(prev) = slot.replace(row) else {
            // replace() filled a vacant slot; undo that before reporting
            // the failure.
            *slot = None;
            return false;
        };
        txn.record_write(WriteRecord {
            table: self.table_id,
            rid,
            prev,
            kind: WriteKind::Update,
        });
        trace!(txn = %txn.id(), %rid, "row updated");
        true
    }

    /// Deletes the row at `rid` within `txn`.
    ///
    /// Returns `false` if the slot is already vacant or unknown.
    pub fn delete(&self, rid: RowId, txn: &Transaction) -> bool {
        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(rid.as_u64() as usize) else {
            return false;
        };
        let Some(prev) = slot.take() else {
            return false;
        };
        txn.record_write(WriteRecord {
            table: self.table_id,
            rid,
            prev,
            kind: WriteKind::Delete,
        });
        trace!(txn = %txn.id(), %rid, "row deleted");
        true
    }

    /// Restores a slot to a prior value during rollback. Bypasses undo
    /// recording.
    pub(crate) fn revert(&self, rid: RowId, row: Row) {
        let mut slots = self.slots.write();
        if let Some(slot) = slots.get_mut(rid.as_u64() as usize) {
            *slot = Some(row);
        }
    }

    /// Returns the identifiers of all occupied slots, in slot order.
    #[must_use]
    pub fn scan(&self) -> Vec<RowId> {
        self.slots
            .read()
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| RowId::new(i as u64)))
            .collect()
    }

    /// Returns the number of occupied slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().iter().filter(|s| s.is_some()).count()
    }

    /// Returns true if the heap holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
