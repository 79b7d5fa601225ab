//! Query execution engine.
//!
//! The execution engine uses a **pull-based iterator model**: each operator
//! implements the [`Operator`] trait with `open()`, `next()`, and `close()`
//! methods, and data flows from leaf operators (scans) up through the plan
//! tree one `(row, rid)` pair at a time.
//!
//! # Modules
//!
//! - [`context`] - Execution context (catalog, lock manager, transaction)
//! - [`row`] - Row type for data flowing between operators
//! - [`operator`] - Operator trait and base types
//! - [`operators`] - Concrete operator implementations
//! - [`plan`] - Plan nodes for the mutating operators
//! - [`error`] - Execution error types
//!
//! # Example
//!
//! ```ignore
//! use quarrydb::exec::{ExecutionContext, Operator, SeqScanOp, UpdateOp, UpdatePlan, UpdateRule};
//!
//! let ctx = ExecutionContext::new(catalog, lock_manager, txn);
//! let child = Box::new(SeqScanOp::new(ctx.catalog(), "accounts")?);
//! let plan = UpdatePlan::new("accounts", UpdateRule::new().add(1, 10i64));
//! let mut update = UpdateOp::new(ctx.catalog(), plan, child)?;
//! update.open(&ctx)?;
//! update.next()?; // drives the child to exhaustion
//! println!("{} rows updated", update.rows_updated());
//! ```

mod context;
mod error;
mod operator;
mod plan;
mod row;

pub mod operators;

// Re-exports
pub use context::ExecutionContext;
pub use error::{ExecError, ExecResult};
pub use operator::{BoxedOperator, Operator, OperatorBase, OperatorState};
pub use operators::{SeqScanOp, UpdateOp};
pub use plan::{UpdateAction, UpdatePlan, UpdateRule};
pub use row::Row;
