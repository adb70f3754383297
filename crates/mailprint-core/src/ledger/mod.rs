//! Print ledger.
//!
//! Durable, single-writer record of every print submission outcome.
//! The ledger is the system of record for reporting; flattened CSV
//! exports are derived from it and never read back.

mod model;
mod repository;

pub use model::{PrintRecord, PrintStatus};
pub use repository::{Ledger, default_export_path};
