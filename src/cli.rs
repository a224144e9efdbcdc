//! Command-line surface.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Audio catalog and backup scheduler
#[derive(Parser, Debug)]
#[command(name = "musica", version, about = "Audio catalog and backup scheduler", long_about = None)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the XDG default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Catalog database to use instead of `catalog.db_path`
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan a library root and reconcile the catalog with what is on disk
    Scan {
        /// Directory to scan (defaults to `library.root`, then the current directory)
        root: Option<PathBuf>,
    },
    /// List catalog entries
    List {
        /// Include tracks not seen by the last scan
        #[arg(long)]
        all: bool,
    },
    /// Show every field of one track
    Show { id: i64 },
    /// List tracks due for backup, most urgent first
    Due {
        /// Override `backup.threshold_secs`
        #[arg(long, value_name = "SECS")]
        threshold: Option<u64>,
    },
    /// Record a completed backup of a track
    Mark {
        id: i64,
        /// Completion time (RFC 3339); defaults to now
        #[arg(long, value_name = "TIME")]
        at: Option<DateTime<Utc>>,
    },
    /// Permanently remove a track and its backup history from the catalog
    Forget { id: i64 },
    /// Summarize the catalog
    Status,
    /// Periodically compute the due set and hand it to `backup.command`
    Poll {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Play a track on the default audio device
    Play { id: i64 },
}
