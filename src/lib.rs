//! `QuarryDB` — an embeddable relational execution kernel.
//!
//! This crate provides the pieces a relational engine needs between a query
//! plan and its data: typed rows over in-memory heap storage, secondary
//! indexes, transactions with two-phase row locking, and a pull-based
//! operator layer whose mutating centerpiece is the UPDATE operator.
//!
//! # Modules
//!
//! - [`types`] - Core data types (Value, Schema, identifiers)
//! - [`storage`] - Row heaps, secondary indexes, and the catalog
//! - [`txn`] - Transactions and the wait-die lock manager
//! - [`exec`] - The operator layer
//!
//! # Consistency contract
//!
//! Row mutations are gated by exclusive row locks; no store write happens
//! without a prior grant. Index maintenance re-keys entries from the
//! post-update row (delete old key, insert new key) under the same row
//! lock; the index structures carry their own internal synchronization.
//! A store write and its index re-keying are not atomic with each other:
//! on transaction abort the row store is rolled back from the undo write
//! set, but index entries written on behalf of the aborted transaction
//! are not compensated — readers must treat an index hit as a hint and
//! verify against the row store. Durability and crash recovery are out
//! of scope.

pub mod exec;
pub mod storage;
pub mod txn;
pub mod types;

// Re-export commonly used types
pub use exec::{ExecError, ExecResult, Operator, Row};
pub use storage::{Catalog, TableInfo};
pub use txn::{IsolationLevel, LockManager, Transaction, TransactionManager};
pub use types::{DataType, RowId, Value};
