//! Plan nodes consumed by the mutating operators.

use std::collections::HashMap;

use crate::types::Value;

/// How one column is updated.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Replace the column with the operand.
    Set(Value),
    /// Add the operand to the column (numeric columns only).
    Add(Value),
}

/// A per-column update specification.
///
/// Maps column indices of the target schema to an [`UpdateAction`].
/// Columns absent from the map pass through unchanged. Rule indices must
/// be valid column indices of the target schema; the update operator
/// validates this at construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRule {
    /// Actions by target column index.
    actions: HashMap<usize, UpdateAction>,
}

impl UpdateRule {
    /// Creates an empty rule (every column passes through).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `Set` action for the given column.
    #[must_use]
    pub fn set(mut self, column: usize, value: impl Into<Value>) -> Self {
        self.actions.insert(column, UpdateAction::Set(value.into()));
        self
    }

    /// Adds an `Add` action for the given column.
    #[must_use]
    pub fn add(mut self, column: usize, operand: impl Into<Value>) -> Self {
        self.actions.insert(column, UpdateAction::Add(operand.into()));
        self
    }

    /// Returns the action for a column, if any.
    #[must_use]
    pub fn action_for(&self, column: usize) -> Option<&UpdateAction> {
        self.actions.get(&column)
    }

    /// Returns the targeted column indices, in no particular order.
    pub fn columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.actions.keys().copied()
    }

    /// Returns true if no column is targeted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Plan node for an UPDATE: the target table and the per-column rule.
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    /// The target table name.
    pub table: String,
    /// The per-column update rule.
    pub rule: UpdateRule,
}

impl UpdatePlan {
    /// Creates an update plan.
    #[must_use]
    pub fn new(table: impl Into<String>, rule: UpdateRule) -> Self {
        Self { table: table.into(), rule }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_actions() {
        let rule = UpdateRule::new().set(0, 5i64).add(2, 10i64);

        assert_eq!(rule.action_for(0), Some(&UpdateAction::Set(Value::Int(5))));
        assert_eq!(rule.action_for(1), None);
        assert_eq!(rule.action_for(2), Some(&UpdateAction::Add(Value::Int(10))));

        let mut columns: Vec<_> = rule.columns().collect();
        columns.sort_unstable();
        assert_eq!(columns, vec![0, 2]);
    }

    #[test]
    fn empty_rule() {
        assert!(UpdateRule::new().is_empty());
        assert!(!UpdateRule::new().set(0, 1i64).is_empty());
    }
}
