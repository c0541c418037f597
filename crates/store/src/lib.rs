//! SQLite result store for scan jobs.
//!
//! This crate is the durable side of a scan: the engine keeps live state in
//! memory while a scan runs, and hands everything over to this store once
//! enumeration is done. Terminal scans stay queryable here long after their
//! in-memory entries have been garbage collected.
//!
//! # Architecture
//! The store holds two entity types:
//! - **Scans**: one row per scan attempt ([`ScanJob`]), carrying the status
//!   and, for completed scans, the [`ScanTotals`].
//! - **Files**: one row per discovered [`FileRecord`](tally_storage::FileRecord),
//!   keyed by scan id. There is no enforced reference from a file to its scan:
//!   files written for an unknown scan id are kept as orphans.

mod db;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::models::{ScanJob, ScanStatus, ScanTotals};
pub use crate::repo::Repository;
