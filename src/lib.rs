//! Catalog local audio files and decide which ones are due for backup.
//!
//! The pipeline is: [`library::scan`] finds audio files under a root,
//! [`catalog::Catalog::reconcile`] folds them into durable track records, and
//! [`scheduler::BackupScheduler::due`] answers which present tracks need a
//! backup. An external [`scheduler::BackupWorker`] does the copying and the
//! catalog records each completion.

pub mod audio;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod runtime;
pub mod scheduler;

pub use error::{Error, Result};
