use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::TrackId;

/// Error types for catalog, scanning and scheduling operations.
///
/// Nothing in the core retries or swallows these; callers decide whether to
/// log-and-continue (for example, skip one unreadable subdirectory) or abort.
#[derive(Error, Debug)]
pub enum Error {
    /// The filesystem could not be read.
    ///
    /// Raised when a scan root is missing or unreadable, or when an entry below
    /// the root cannot be visited.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An operation referenced a track id the catalog does not know.
    #[error("track {0} not found")]
    NotFound(TrackId),

    /// A catalog invariant would have been broken.
    ///
    /// # Common Causes
    /// - The same path reported twice in one reconcile call
    /// - A relative path handed to reconcile
    /// - A stored backup timestamp moving backwards
    #[error("catalog invariant violated: {0}")]
    Invariant(String),

    /// The persistence store failed. The enclosing transaction has been rolled
    /// back and the in-memory view left untouched.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The audio output or decoder failed.
    #[error("playback error: {0}")]
    Playback(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
