use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Stable catalog identity of a track. Assigned once, never reissued.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub i64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    /// Absolute path; unique among present tracks.
    pub path: PathBuf,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    pub size: Option<u64>,
    /// Lowercased file extension, e.g. `flac`.
    pub format: Option<String>,
    pub added_at: DateTime<Utc>,
    /// Time of the last successful backup; `None` if never backed up.
    pub last_backup: Option<DateTime<Utc>>,
    /// Whether the file was seen by the most recent reconcile.
    pub present: bool,
}

/// Descriptive fields produced by a metadata lookup during reconcile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
    pub size: Option<u64>,
    pub format: Option<String>,
}

impl TrackMetadata {
    /// Trim text fields and drop the blank ones.
    pub(crate) fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        Self {
            title: clean(self.title),
            artist: clean(self.artist),
            album: clean(self.album),
            duration: self.duration,
            size: self.size,
            format: clean(self.format).map(|f| f.to_ascii_lowercase()),
        }
    }
}

/// Which tracks `Catalog::list` returns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    PresentOnly,
    All,
}

/// What one reconcile cycle changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Paths seen for the first time.
    pub added: usize,
    /// Present tracks re-observed and refreshed.
    pub updated: usize,
    /// Retained absent tracks that reappeared under their old id.
    pub revived: usize,
    /// Previously present tracks not seen this time.
    pub missing: usize,
}

/// Counts for a status overview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub total: usize,
    pub present: usize,
    pub missing: usize,
    pub never_backed_up: usize,
}

/// Outcome of one backup run as a whole.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every due track was backed up.
    Success,
    /// At least one track failed and is still due.
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log entry for one backup run, kept in the catalog database.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupRun {
    /// When the run was started.
    pub ran_at: DateTime<Utc>,
    pub status: RunStatus,
    pub due: usize,
    pub backed_up: usize,
    pub failed: usize,
    /// Where the worker sent the files, if it says.
    pub target: Option<String>,
}
