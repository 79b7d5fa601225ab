//! Core data types: values, schemas, and identifiers.

mod id;
mod schema;
mod value;

pub use id::{RowId, TableId, TxnId};
pub use schema::{schema_of, Column, Schema};
pub use value::{DataType, Value};
