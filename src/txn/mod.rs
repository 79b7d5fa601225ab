//! Transactions and two-phase locking.
//!
//! # Modules
//!
//! - [`transaction`] - Per-transaction state: isolation level, 2PL phase,
//!   held locks, undo records
//! - [`lock_manager`] - The [`RowLockManager`] capability trait and the
//!   wait-die [`LockManager`]
//! - [`manager`] - Transaction lifecycle (begin/commit/abort)

mod lock_manager;
mod manager;
mod transaction;

pub use lock_manager::{LockManager, RowLockManager};
pub use manager::TransactionManager;
pub use transaction::{
    IsolationLevel, Transaction, TransactionState, WriteKind, WriteRecord,
};
