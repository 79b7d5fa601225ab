//! Transaction state: isolation level, lock bookkeeping, and undo records.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::exec::Row;
use crate::types::{RowId, TableId, TxnId};

/// The isolation level a transaction runs under.
///
/// The level governs when row locks may be released: `RepeatableRead` (the
/// strictest level here) holds every acquired lock until transaction end,
/// the weaker levels allow release as soon as the protected operation is
/// done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    /// No shared locks are taken for reads; writes may see uncommitted data.
    ReadUncommitted,
    /// Shared locks are taken for reads and released immediately after.
    ReadCommitted,
    /// All locks are held until the transaction commits or aborts.
    RepeatableRead,
}

/// The two-phase locking state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// The transaction may acquire locks.
    Growing,
    /// The transaction has released a lock and may not acquire new ones.
    Shrinking,
    /// The transaction committed; all locks are released.
    Committed,
    /// The transaction aborted; its writes have been undone.
    Aborted,
}

/// The kind of mutation recorded in the undo write set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// The row was overwritten; `prev` holds the old contents.
    Update,
    /// The row was deleted; `prev` holds the old contents.
    Delete,
}

/// An undo record for one row mutation, applied in reverse on abort.
#[derive(Debug, Clone)]
pub struct WriteRecord {
    /// The table the mutation happened in.
    pub table: TableId,
    /// The mutated row slot.
    pub rid: RowId,
    /// The row contents before the mutation.
    pub prev: Row,
    /// What kind of mutation was performed.
    pub kind: WriteKind,
}

/// Per-transaction execution state.
///
/// A `Transaction` is owned by the surrounding execution context. Operators
/// only read it (isolation level, held locks) and pass it to the lock
/// manager and row store; they never create, commit, or abort it. The lock
/// manager mirrors every granted and released lock into the held-lock sets,
/// and the row store appends an undo record for every mutation.
#[derive(Debug)]
pub struct Transaction {
    /// The transaction id; doubles as its age for wait-die.
    id: TxnId,
    /// The isolation level, fixed at begin.
    isolation: IsolationLevel,
    /// The 2PL state.
    state: Mutex<TransactionState>,
    /// Rows this transaction holds shared locks on.
    shared_locks: Mutex<HashSet<RowId>>,
    /// Rows this transaction holds exclusive locks on.
    exclusive_locks: Mutex<HashSet<RowId>>,
    /// Undo records in application order.
    write_set: Mutex<Vec<WriteRecord>>,
}

impl Transaction {
    /// Creates a new transaction in the growing phase.
    #[must_use]
    pub fn new(id: TxnId, isolation: IsolationLevel) -> Self {
        Self {
            id,
            isolation,
            state: Mutex::new(TransactionState::Growing),
            shared_locks: Mutex::new(HashSet::new()),
            exclusive_locks: Mutex::new(HashSet::new()),
            write_set: Mutex::new(Vec::new()),
        }
    }

    /// Returns the transaction id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> TxnId {
        self.id
    }

    /// Returns the isolation level.
    #[inline]
    #[must_use]
    pub const fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    /// Returns the current 2PL state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    /// Sets the 2PL state.
    pub fn set_state(&self, state: TransactionState) {
        *self.state.lock() = state;
    }

    /// Returns `true` if this transaction holds a shared lock on `rid`.
    #[must_use]
    pub fn is_shared_locked(&self, rid: RowId) -> bool {
        self.shared_locks.lock().contains(&rid)
    }

    /// Returns `true` if this transaction holds an exclusive lock on `rid`.
    #[must_use]
    pub fn is_exclusive_locked(&self, rid: RowId) -> bool {
        self.exclusive_locks.lock().contains(&rid)
    }

    /// Returns a snapshot of all rows locked by this transaction.
    #[must_use]
    pub fn held_locks(&self) -> Vec<RowId> {
        let mut rids: Vec<RowId> = self.shared_locks.lock().iter().copied().collect();
        rids.extend(self.exclusive_locks.lock().iter().copied());
        rids
    }

    pub(crate) fn add_shared(&self, rid: RowId) {
        self.shared_locks.lock().insert(rid);
    }

    pub(crate) fn add_exclusive(&self, rid: RowId) {
        self.exclusive_locks.lock().insert(rid);
    }

    pub(crate) fn remove_shared(&self, rid: RowId) -> bool {
        self.shared_locks.lock().remove(&rid)
    }

    pub(crate) fn remove_exclusive(&self, rid: RowId) -> bool {
        self.exclusive_locks.lock().remove(&rid)
    }

    /// Appends an undo record for a mutation performed by this transaction.
    pub(crate) fn record_write(&self, record: WriteRecord) {
        self.write_set.lock().push(record);
    }

    /// Drains the undo records, newest first, for rollback.
    pub(crate) fn take_write_set(&self) -> Vec<WriteRecord> {
        let mut records = std::mem::take(&mut *self.write_set.lock());
        records.reverse();
        records
    }

    /// Returns the number of recorded mutations.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.write_set.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_growing() {
        let txn = Transaction::new(TxnId::new(1), IsolationLevel::RepeatableRead);
        assert_eq!(txn.state(), TransactionState::Growing);
        assert_eq!(txn.isolation(), IsolationLevel::RepeatableRead);
    }

    #[test]
    fn lock_bookkeeping() {
        let txn = Transaction::new(TxnId::new(1), IsolationLevel::ReadCommitted);
        let rid = RowId::new(9);

        assert!(!txn.is_shared_locked(rid));
        txn.add_shared(rid);
        assert!(txn.is_shared_locked(rid));
        assert!(txn.remove_shared(rid));
        assert!(!txn.remove_shared(rid));
    }

    #[test]
    fn write_set_drains_in_reverse() {
        use crate::types::{schema_of, DataType, Value};

        let txn = Transaction::new(TxnId::new(1), IsolationLevel::ReadCommitted);
        let schema = schema_of(&[("v", DataType::Int)]);
        for i in 0..3 {
            txn.record_write(WriteRecord {
                table: TableId::new(1),
                rid: RowId::new(i),
                prev: Row::new(schema.clone(), vec![Value::Int(i as i64)]),
                kind: WriteKind::Update,
            });
        }

        let drained = txn.take_write_set();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0].rid, RowId::new(2));
        assert_eq!(txn.write_count(), 0);
    }
}
