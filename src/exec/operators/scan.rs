//! Sequential scan operator.

use std::sync::Arc;

use crate::exec::context::ExecutionContext;
use crate::exec::error::{ExecError, ExecResult};
use crate::exec::operator::{Operator, OperatorBase, OperatorState};
use crate::exec::row::Row;
use crate::storage::{Catalog, TableInfo};
use crate::txn::{IsolationLevel, RowLockManager, Transaction};
use crate::types::{RowId, Schema};

/// Sequential scan over a table heap.
///
/// Snapshots the occupied row identifiers at `open` and yields one
/// `(row, rid)` pair per `next` call, in slot order. Rows deleted after
/// the snapshot are skipped.
///
/// Shared locks follow the transaction's isolation level: none under
/// `ReadUncommitted`; acquired and released around each read under
/// `ReadCommitted`; acquired and held under `RepeatableRead`. A refused
/// lock is a deadlock abort. The held shared locks under `RepeatableRead`
/// are what a downstream update operator upgrades.
pub struct SeqScanOp {
    /// Base operator state.
    base: OperatorBase,
    /// The resolved table.
    table: Arc<TableInfo>,
    /// Snapshot of row identifiers to visit.
    rids: Vec<RowId>,
    /// Cursor into `rids`.
    cursor: usize,
    /// Lock manager, bound at open.
    lock_manager: Option<Arc<dyn RowLockManager>>,
    /// Transaction, bound at open.
    txn: Option<Arc<Transaction>>,
}

impl SeqScanOp {
    /// Creates a scan over `table`, resolving it through the catalog.
    ///
    /// Fails with [`ExecError::UnknownTable`] if the catalog cannot
    /// resolve the name.
    pub fn new(catalog: &Catalog, table: &str) -> ExecResult<Self> {
        let table = catalog
            .table(table)
            .ok_or_else(|| ExecError::UnknownTable(table.to_string()))?;

        Ok(Self {
            base: OperatorBase::new(Arc::clone(&table.schema)),
            table,
            rids: Vec::new(),
            cursor: 0,
            lock_manager: None,
            txn: None,
        })
    }

    /// Acquires the read lock for `rid` per the isolation level. Returns
    /// `true` if the row may be read and whether the lock must be released
    /// right after.
    fn acquire_read_lock(
        txn: &Transaction,
        lock_manager: &dyn RowLockManager,
        rid: RowId,
    ) -> ExecResult<bool> {
        match txn.isolation() {
            IsolationLevel::ReadUncommitted => Ok(false),
            IsolationLevel::ReadCommitted | IsolationLevel::RepeatableRead => {
                if txn.is_shared_locked(rid) || txn.is_exclusive_locked(rid) {
                    return Ok(false);
                }
                if !lock_manager.lock_shared(txn, rid) {
                    return Err(ExecError::Deadlock { txn_id: txn.id(), rid });
                }
                Ok(txn.isolation() == IsolationLevel::ReadCommitted)
            }
        }
    }
}

impl Operator for SeqScanOp {
    fn open(&mut self, ctx: &ExecutionContext) -> ExecResult<()> {
        self.rids = self.table.heap.scan();
        self.cursor = 0;
        self.lock_manager = Some(ctx.lock_manager_arc());
        self.txn = Some(ctx.transaction_arc());
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<(Row, RowId)>> {
        let txn = self
            .txn
            .clone()
            .ok_or_else(|| ExecError::Internal("next called before open".to_string()))?;
        let lock_manager = self
            .lock_manager
            .clone()
            .ok_or_else(|| ExecError::Internal("next called before open".to_string()))?;

        while self.cursor < self.rids.len() {
            let rid = self.rids[self.cursor];
            self.cursor += 1;

            let release_after = Self::acquire_read_lock(&txn, lock_manager.as_ref(), rid)?;
            let row = self.table.heap.get(rid);
            if release_after {
                lock_manager.unlock(&txn, rid);
            }

            // Deleted since the snapshot; move on.
            let Some(row) = row else { continue };

            self.base.inc_rows_produced();
            return Ok(Some((row, rid)));
        }

        self.base.set_finished();
        Ok(None)
    }

    fn close(&mut self) -> ExecResult<()> {
        self.lock_manager = None;
        self.txn = None;
        self.base.set_closed();
        Ok(())
    }

    fn schema(&self) -> Arc<Schema> {
        self.base.schema()
    }

    fn state(&self) -> OperatorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "SeqScan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::txn::LockManager;
    use crate::types::{schema_of, DataType, TxnId, Value};

    fn setup(isolation: IsolationLevel) -> (Arc<Catalog>, ExecutionContext, Arc<TableInfo>) {
        let catalog = Arc::new(Catalog::new());
        let schema = schema_of(&[("id", DataType::Int)]);
        let info = catalog.create_table("t", Arc::clone(&schema)).unwrap();
        for i in 0..3 {
            info.heap.insert(Row::new(Arc::clone(&schema), vec![Value::Int(i)]));
        }

        let lm: Arc<dyn RowLockManager> = Arc::new(LockManager::new());
        let txn = Arc::new(Transaction::new(TxnId::new(1), isolation));
        let ctx = ExecutionContext::new(Arc::clone(&catalog), lm, txn);
        (catalog, ctx, info)
    }

    #[test]
    fn yields_rows_in_slot_order() {
        let (catalog, ctx, _) = setup(IsolationLevel::ReadUncommitted);
        let mut op = SeqScanOp::new(&catalog, "t").unwrap();
        op.open(&ctx).unwrap();

        let mut seen = Vec::new();
        while let Some((row, _)) = op.next().unwrap() {
            seen.push(row.get(0).unwrap().clone());
        }
        assert_eq!(seen, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
        assert!(op.state().is_finished());
    }

    #[test]
    fn unknown_table_is_a_configuration_error() {
        let catalog = Catalog::new();
        assert!(matches!(
            SeqScanOp::new(&catalog, "missing"),
            Err(ExecError::UnknownTable(_))
        ));
    }

    #[test]
    fn repeatable_read_holds_shared_locks() {
        let (catalog, ctx, _) = setup(IsolationLevel::RepeatableRead);
        let mut op = SeqScanOp::new(&catalog, "t").unwrap();
        op.open(&ctx).unwrap();

        let (_, rid) = op.next().unwrap().unwrap();
        assert!(ctx.transaction().is_shared_locked(rid));
    }

    #[test]
    fn read_committed_releases_shared_locks() {
        let (catalog, ctx, _) = setup(IsolationLevel::ReadCommitted);
        let mut op = SeqScanOp::new(&catalog, "t").unwrap();
        op.open(&ctx).unwrap();

        let (_, rid) = op.next().unwrap().unwrap();
        assert!(!ctx.transaction().is_shared_locked(rid));
    }

    #[test]
    fn skips_rows_deleted_after_snapshot() {
        let (catalog, ctx, info) = setup(IsolationLevel::ReadUncommitted);
        let mut op = SeqScanOp::new(&catalog, "t").unwrap();
        op.open(&ctx).unwrap();

        // Delete the second row between open and iteration.
        info.heap.delete(RowId::new(1), ctx.transaction());

        let mut count = 0;
        while op.next().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
