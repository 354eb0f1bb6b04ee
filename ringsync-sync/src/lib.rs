//! # ringsync-sync
//!
//! Transfer and reporting for one backup run.
//!
//! Call [`run_client`] to back up a single client, or [`run_all`] to work
//! through a client list.

pub mod error;
pub mod pipeline;
pub mod report;
pub mod runner;

pub use error::{LogWriteError, RunError, SyncError};
pub use pipeline::{run_all, run_client, ClientRunReport, ClientRunStatus, RunContext};
pub use report::{format_record, map_stats, LogDestination, LogWriteResult, Reporter, STAT_LABELS};
pub use runner::SyncRunner;
