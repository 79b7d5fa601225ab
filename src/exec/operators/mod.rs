//! Concrete operator implementations.

mod scan;
mod update;

pub use scan::SeqScanOp;
pub use update::UpdateOp;
