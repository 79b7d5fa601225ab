//! UPDATE operator.
//!
//! Consumes `(row, rid)` pairs from its child, computes new column values
//! per the plan's [`UpdateRule`], writes the new row back to the table
//! heap in place, keeps every secondary index consistent, and enforces the
//! two-phase-locking retention policy for the transaction's isolation
//! level.

use std::sync::Arc;

use tracing::debug;

use crate::exec::context::ExecutionContext;
use crate::exec::error::{ExecError, ExecResult};
use crate::exec::operator::{BoxedOperator, Operator, OperatorBase, OperatorState};
use crate::exec::plan::{UpdateAction, UpdatePlan, UpdateRule};
use crate::exec::row::Row;
use crate::storage::{Catalog, IndexInfo, TableInfo};
use crate::txn::{IsolationLevel, RowLockManager, Transaction};
use crate::types::{RowId, Schema, Value};

/// Builds the updated row from a source row.
///
/// Iterates every column of the target schema in order: columns absent
/// from the rule pass through unchanged, `Set` replaces the value, `Add`
/// performs numeric addition. The output row's column order exactly
/// matches the schema — index-key derivation and the heap both assume
/// schema-aligned positional values.
fn apply_rule(schema: &Arc<Schema>, rule: &UpdateRule, src: &Row) -> ExecResult<Row> {
    let mut values = Vec::with_capacity(schema.column_count());
    for idx in 0..schema.column_count() {
        let current = src.get(idx).cloned().unwrap_or(Value::Null);
        let value = match rule.action_for(idx) {
            None => current,
            Some(UpdateAction::Set(v)) => v.clone(),
            Some(UpdateAction::Add(operand)) => {
                current.checked_add(operand).ok_or_else(|| {
                    ExecError::Type(format!(
                        "cannot add {operand} to value {current} in column {idx}"
                    ))
                })?
            }
        };
        values.push(value);
    }
    Ok(Row::new(Arc::clone(schema), values))
}

/// UPDATE operator.
///
/// A sink with respect to query results: it drives its child to
/// exhaustion inside `next` and then reports "no more rows"; the number
/// of rows it mutated is exposed through [`rows_updated`].
///
/// Per child row the operator:
///
/// 1. acquires an exclusive lock on the row's identifier — upgrading when
///    the transaction already holds a shared lock from the scan below; a
///    refusal is a deadlock abort and nothing has been mutated yet;
/// 2. computes the updated row per the plan's rule;
/// 3. writes it back to the heap in place; a rejected write halts
///    iteration before any index is touched (fail-fast);
/// 4. re-keys every secondary index: the old row's key entry is removed
///    and the new row's key inserted, so no stale entry survives;
/// 5. releases the lock immediately unless the transaction runs at
///    `RepeatableRead`, which retains all locks until transaction end.
///
/// Errors are terminal: the operator never retries, and compensation for
/// mutations already applied is the transaction manager's rollback, not
/// the operator's.
///
/// [`rows_updated`]: UpdateOp::rows_updated
pub struct UpdateOp {
    /// Base operator state.
    base: OperatorBase,
    /// The resolved target table; immutable for the operator's lifetime.
    table: Arc<TableInfo>,
    /// The secondary indexes on the target table, resolved at construction.
    indexes: Vec<IndexInfo>,
    /// The per-column update rule.
    rule: UpdateRule,
    /// Child operator supplying `(row, rid)` pairs.
    child: BoxedOperator,
    /// Lock manager, bound at open.
    lock_manager: Option<Arc<dyn RowLockManager>>,
    /// Transaction, bound at open.
    txn: Option<Arc<Transaction>>,
    /// Number of rows successfully updated.
    rows_updated: u64,
}

impl UpdateOp {
    /// Creates an update operator for `plan` with `child` as row source.
    ///
    /// Resolves the target table through the catalog
    /// ([`ExecError::UnknownTable`] if the plan names an unknown table — a
    /// planner error) and validates that every rule column index lies
    /// within the table schema ([`ExecError::InvalidRuleColumn`]). The
    /// table handle and index descriptors are held read-only thereafter.
    pub fn new(catalog: &Catalog, plan: UpdatePlan, child: BoxedOperator) -> ExecResult<Self> {
        let table = catalog
            .table(&plan.table)
            .ok_or_else(|| ExecError::UnknownTable(plan.table.clone()))?;

        let columns = table.schema.column_count();
        if let Some(index) = plan.rule.columns().find(|&i| i >= columns) {
            return Err(ExecError::InvalidRuleColumn {
                index,
                table: plan.table,
                columns,
            });
        }

        let indexes = catalog.table_indexes(&table.name);
        Ok(Self {
            base: OperatorBase::new(Arc::clone(&table.schema)),
            table,
            indexes,
            rule: plan.rule,
            child,
            lock_manager: None,
            txn: None,
            rows_updated: 0,
        })
    }

    /// Returns the number of rows updated so far.
    #[must_use]
    pub const fn rows_updated(&self) -> u64 {
        self.rows_updated
    }

    /// Locks, transforms, writes, and re-indexes one child row.
    fn apply_one(
        &mut self,
        row: Row,
        rid: RowId,
        txn: &Transaction,
        lock_manager: &dyn RowLockManager,
    ) -> ExecResult<()> {
        // Exactly one exclusive grant precedes the store write: upgrade a
        // shared lock left by the scan below, otherwise acquire exclusive
        // directly. Nothing has been mutated yet when a refusal unwinds.
        if txn.is_shared_locked(rid) {
            if !lock_manager.lock_upgrade(txn, rid) {
                return Err(ExecError::Deadlock { txn_id: txn.id(), rid });
            }
        } else if !txn.is_exclusive_locked(rid) && !lock_manager.lock_exclusive(txn, rid) {
            return Err(ExecError::Deadlock { txn_id: txn.id(), rid });
        }

        let updated = apply_rule(&self.table.schema, &self.rule, &row)?;

        if !self.table.heap.update(updated.clone(), rid, txn) {
            debug!(txn = %txn.id(), %rid, "row store rejected update, halting");
            return Err(ExecError::StoreWrite { rid });
        }

        // Re-key every secondary index from the post-update row. The old
        // entry is removed first so an update of an indexed column leaves
        // no stale key behind.
        for index in &self.indexes {
            let old_key = row.project(&index.key_attrs);
            let new_key = updated.project(&index.key_attrs);
            index.index.delete(&old_key, rid);
            index.index.insert(&new_key, rid);
        }

        // Lock retention: only the strictest level keeps the row lock
        // until transaction end.
        if txn.isolation() != IsolationLevel::RepeatableRead && !lock_manager.unlock(txn, rid) {
            return Err(ExecError::LockViolation { txn_id: txn.id(), rid });
        }

        self.rows_updated += 1;
        Ok(())
    }
}

impl Operator for UpdateOp {
    fn open(&mut self, ctx: &ExecutionContext) -> ExecResult<()> {
        self.child.open(ctx)?;
        self.lock_manager = Some(ctx.lock_manager_arc());
        self.txn = Some(ctx.transaction_arc());
        self.base.set_open();
        Ok(())
    }

    fn next(&mut self) -> ExecResult<Option<(Row, RowId)>> {
        if self.base.state().is_finished() {
            return Ok(None);
        }
        let txn = self
            .txn
            .clone()
            .ok_or_else(|| ExecError::Internal("next called before open".to_string()))?;
        let lock_manager = self
            .lock_manager
            .clone()
            .ok_or_else(|| ExecError::Internal("next called before open".to_string()))?;

        while let Some((row, rid)) = self.child.next()? {
            self.apply_one(row, rid, &txn, lock_manager.as_ref())?;
        }

        self.base.set_finished();
        Ok(None)
    }

    fn close(&mut self) -> ExecResult<()> {
        self.child.close()?;
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
        "Update"
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::types::{schema_of, DataType};

    fn two_int_schema() -> Arc<Schema> {
        schema_of(&[("id", DataType::Int), ("balance", DataType::Int)])
    }

    fn row(schema: &Arc<Schema>, id: i64, balance: i64) -> Row {
        Row::new(Arc::clone(schema), vec![Value::Int(id), Value::Int(balance)])
    }

    #[test]
    fn empty_rule_is_identity() {
        let schema = two_int_schema();
        let src = row(&schema, 1, 100);
        let out = apply_rule(&schema, &UpdateRule::new(), &src).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn set_replaces_and_add_accumulates() {
        let schema = two_int_schema();
        let src = row(&schema, 1, 100);
        let rule = UpdateRule::new().set(0, 9i64).add(1, 10i64);

        let out = apply_rule(&schema, &rule, &src).unwrap();
        assert_eq!(out.values(), &[Value::Int(9), Value::Int(110)]);
    }

    #[test]
    fn untouched_columns_pass_through_in_order() {
        let schema = schema_of(&[
            ("a", DataType::Int),
            ("b", DataType::String),
            ("c", DataType::Int),
        ]);
        let src = Row::new(
            Arc::clone(&schema),
            vec![Value::Int(1), Value::from("x"), Value::Int(3)],
        );
        let rule = UpdateRule::new().add(2, 1i64);

        let out = apply_rule(&schema, &rule, &src).unwrap();
        assert_eq!(
            out.values(),
            &[Value::Int(1), Value::from("x"), Value::Int(4)]
        );
    }

    #[test]
    fn add_on_non_numeric_is_a_type_error() {
        let schema = schema_of(&[("s", DataType::String)]);
        let src = Row::new(Arc::clone(&schema), vec![Value::from("x")]);
        let rule = UpdateRule::new().add(0, 1i64);

        assert!(matches!(
            apply_rule(&schema, &rule, &src),
            Err(ExecError::Type(_))
        ));
    }

    proptest! {
        #[test]
        fn set_is_idempotent(initial in any::<i64>(), target in any::<i64>()) {
            let schema = schema_of(&[("v", DataType::Int)]);
            let rule = UpdateRule::new().set(0, target);
            let src = Row::new(Arc::clone(&schema), vec![Value::Int(initial)]);

            let once = apply_rule(&schema, &rule, &src).unwrap();
            let twice = apply_rule(&schema, &rule, &once).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.get(0), Some(&Value::Int(target)));
        }

        #[test]
        fn add_is_cumulative_not_idempotent(
            initial in -1_000_000i64..1_000_000,
            delta in 1i64..1_000,
        ) {
            let schema = schema_of(&[("v", DataType::Int)]);
            let rule = UpdateRule::new().add(0, delta);
            let src = Row::new(Arc::clone(&schema), vec![Value::Int(initial)]);

            let once = apply_rule(&schema, &rule, &src).unwrap();
            let twice = apply_rule(&schema, &rule, &once).unwrap();
            prop_assert_eq!(once.get(0), Some(&Value::Int(initial + delta)));
            prop_assert_eq!(twice.get(0), Some(&Value::Int(initial + 2 * delta)));
            prop_assert_ne!(&once, &twice);
        }

        #[test]
        fn absent_columns_are_untouched(id in any::<i64>(), balance in -1_000_000i64..1_000_000) {
            let schema = schema_of(&[("id", DataType::Int), ("balance", DataType::Int)]);
            let rule = UpdateRule::new().add(1, 10i64);
            let src = Row::new(
                Arc::clone(&schema),
                vec![Value::Int(id), Value::Int(balance)],
            );

            let out = apply_rule(&schema, &rule, &src).unwrap();
            prop_assert_eq!(out.get(0), Some(&Value::Int(id)));
        }
    }
}
