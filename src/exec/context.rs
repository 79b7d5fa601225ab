//! Execution context for query execution.
//!
//! The context bundles the collaborators an operator tree needs: the
//! catalog for metadata resolution, the lock manager, and the transaction
//! the query runs inside. All three are injected at construction, so tests
//! can substitute fakes (in particular a recording lock manager).

use std::sync::Arc;

use crate::storage::Catalog;
use crate::txn::{RowLockManager, Transaction};

/// Execution context for a query.
///
/// The context never owns the transaction's lifecycle: it is created around
/// an already-begun transaction and dropped before the caller commits or
/// aborts it.
pub struct ExecutionContext {
    /// The catalog used to resolve tables and enumerate indexes.
    catalog: Arc<Catalog>,
    /// The lock manager arbitrating row access across transactions.
    lock_manager: Arc<dyn RowLockManager>,
    /// The transaction this query runs inside.
    txn: Arc<Transaction>,
}

impl ExecutionContext {
    /// Creates a context from its collaborators.
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        lock_manager: Arc<dyn RowLockManager>,
        txn: Arc<Transaction>,
    ) -> Self {
        Self { catalog, lock_manager, txn }
    }

    /// Returns a reference to the catalog.
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the catalog as an `Arc`.
    #[inline]
    #[must_use]
    pub fn catalog_arc(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    /// Returns a reference to the lock manager.
    #[inline]
    #[must_use]
    pub fn lock_manager(&self) -> &dyn RowLockManager {
        self.lock_manager.as_ref()
    }

    /// Returns the lock manager as an `Arc`, for operators that hold onto
    /// it for the duration of their execution.
    #[inline]
    #[must_use]
    pub fn lock_manager_arc(&self) -> Arc<dyn RowLockManager> {
        Arc::clone(&self.lock_manager)
    }

    /// Returns a reference to the transaction.
    #[inline]
    #[must_use]
    pub fn transaction(&self) -> &Transaction {
        &self.txn
    }

    /// Returns the transaction as an `Arc`.
    #[inline]
    #[must_use]
    pub fn transaction_arc(&self) -> Arc<Transaction> {
        Arc::clone(&self.txn)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("txn", &self.txn.id())
            .field("lock_manager", &"<RowLockManager>")
            .finish_non_exhaustive()
    }
}
