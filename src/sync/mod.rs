//! Pulls farmOS records into the local database.
//!
//! A [`SyncRequest`] names the record kinds to sync. Each kind becomes one
//! [`SyncOperation`], and [`SyncRunner`] executes them in order:
//!
//! 1. Authenticate with farmOS (once per run, skipped if already logged in)
//! 2. Fetch every page of matching records
//! 3. Convert records to local rows
//! 4. Upsert the rows in a single transaction per operation
//!
//! Failures are contained per operation and show up in the [`SyncReport`].

mod operation;
mod runner;

pub use operation::{SyncOperation, SyncRequest};
pub use runner::{OperationReport, OperationStatus, SyncReport, SyncRunner};
