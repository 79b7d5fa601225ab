//! Storage layer: row heaps, secondary indexes, and the catalog.
//!
//! # Modules
//!
//! - [`heap`] - In-memory slotted row store with stable row identifiers
//! - [`index`] - The [`RowIndex`] trait and the in-memory B-tree index
//! - [`catalog`] - Table and index metadata resolution

mod catalog;
mod heap;
mod index;

pub use catalog::{Catalog, IndexInfo, TableInfo};
pub use heap::TableHeap;
pub use index::{BTreeIndex, RowIndex};
