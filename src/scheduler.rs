//! Backup scheduling: which present tracks are due, and recording completion.
//!
//! `BackupScheduler::due` is a pure query over a catalog snapshot, safe to poll.
//! `run_cycle` and `Poller` close the loop with an external `BackupWorker`.

mod poll;
mod policy;
mod worker;

pub use poll::{CycleReport, Poller, run_cycle};
pub use policy::{BackupScheduler, due, is_due};
pub use worker::{BackupWorker, CommandWorker, WorkerError};
