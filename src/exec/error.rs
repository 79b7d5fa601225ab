//! Error types for query execution.

use thiserror::Error;

use crate::types::{RowId, TxnId};

/// Errors that can occur while constructing or running execution operators.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The plan named a table the catalog cannot resolve. This is a
    /// planner/programmer error, not recoverable at this layer.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// An update rule targeted a column index outside the table schema.
    #[error("update rule column {index} out of range for table '{table}' with {columns} columns")]
    InvalidRuleColumn {
        /// The offending column index.
        index: usize,
        /// The target table name.
        table: String,
        /// The table's column count.
        columns: usize,
    },

    /// The lock manager refused a lock request, choosing this transaction
    /// as the victim of a (potential) deadlock. Transaction-fatal: the
    /// caller must abort; operators never retry.
    #[error("{txn_id} aborted: deadlock on {rid}")]
    Deadlock {
        /// The victim transaction.
        txn_id: TxnId,
        /// The row whose lock could not be granted.
        rid: RowId,
    },

    /// The row store rejected an update (e.g., the slot was deleted
    /// concurrently). Halts iteration; the transaction's fate is left to
    /// the caller.
    #[error("row store rejected update for {rid}")]
    StoreWrite {
        /// The row that could not be written.
        rid: RowId,
    },

    /// A lock was released that the transaction did not hold, or released
    /// in a state where release is not allowed.
    #[error("{txn_id} released a lock it did not hold on {rid}")]
    LockViolation {
        /// The transaction that attempted the release.
        txn_id: TxnId,
        /// The row whose lock state was invalid.
        rid: RowId,
    },

    /// A value operation failed due to operand types (e.g., Add on a
    /// non-numeric column, or integer overflow).
    #[error("type error: {0}")]
    Type(String),

    /// An operator protocol violation (e.g., `next` before `open`).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecError {
    /// Returns `true` if this error aborts the surrounding transaction.
    #[must_use]
    pub const fn is_transaction_fatal(&self) -> bool {
        matches!(self, Self::Deadlock { .. })
    }
}

/// Result type alias for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadlock_is_transaction_fatal() {
        let err = ExecError::Deadlock { txn_id: TxnId::new(1), rid: RowId::new(2) };
        assert!(err.is_transaction_fatal());

        let err = ExecError::StoreWrite { rid: RowId::new(2) };
        assert!(!err.is_transaction_fatal());
    }

    #[test]
    fn messages_name_the_subject() {
        let err = ExecError::UnknownTable("accounts".into());
        assert_eq!(err.to_string(), "unknown table: accounts");
    }
}
