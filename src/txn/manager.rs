//! Transaction lifecycle: begin, commit, abort.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::storage::Catalog;
use crate::types::TxnId;

use super::lock_manager::RowLockManager;
use super::transaction::{IsolationLevel, Transaction, TransactionState, WriteKind};

/// Creates transactions and drives their commit/abort paths.
///
/// Operators never touch this type: they receive an already-begun
/// [`Transaction`] through the execution context, and the surrounding
/// caller decides the transaction's fate after execution finishes or
/// fails.
pub struct TransactionManager {
    /// The catalog, used to resolve heaps during rollback.
    catalog: Arc<Catalog>,
    /// The lock manager that releases held locks at transaction end.
    lock_manager: Arc<dyn RowLockManager>,
    /// Next transaction id to issue; ids are ages for wait-die.
    next_txn_id: AtomicU64,
}

impl TransactionManager {
    /// Creates a transaction manager over the given catalog and lock
    /// manager.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, lock_manager: Arc<dyn RowLockManager>) -> Self {
        Self { catalog, lock_manager, next_txn_id: AtomicU64::new(1) }
    }

    /// Begins a new transaction at the given isolation level.
    #[must_use]
    pub fn begin(&self, isolation: IsolationLevel) -> Arc<Transaction> {
        let id = TxnId::new(self.next_txn_id.fetch_add(1, Ordering::Relaxed));
        Arc::new(Transaction::new(id, isolation))
    }

    /// Commits `txn`: releases every held lock and marks it committed.
    pub fn commit(&self, txn: &Transaction) {
        self.lock_manager.unlock_all(txn);
        txn.set_state(TransactionState::Committed);
        debug!(txn = %txn.id(), "transaction committed");
    }

    /// Aborts `txn`: undoes its row mutations newest-first, releases every
    /// held lock, and marks it aborted.
    ///
    /// Index entries written on behalf of the aborted transaction are not
    /// compensated here; see the crate documentation for the consistency
    /// contract.
    pub fn abort(&self, txn: &Transaction) {
        for record in txn.take_write_set() {
            match record.kind {
                WriteKind::Update | WriteKind::Delete => {
                    self.catalog.revert_row(record.table, record.rid, record.prev);
                }
            }
        }
        self.lock_manager.unlock_all(txn);
        txn.set_state(TransactionState::Aborted);
        debug!(txn = %txn.id(), "transaction aborted");
    }
}
