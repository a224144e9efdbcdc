use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::LibrarySettings;

/// Recognized audio suffixes, compared case-insensitively against file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSet {
    /// Lowercased, each with a leading dot: `.mp3`.
    suffixes: Vec<String>,
}

impl ExtensionSet {
    /// Build from entries like `mp3`, `.MP3` or ` flac `; blanks are dropped.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes: Vec<String> = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{e}"))
            .collect();
        suffixes.sort();
        suffixes.dedup();
        Self { suffixes }
    }

    /// Whether a bare file name ends with one of the suffixes. A dotfile that
    /// is nothing but the suffix (`.mp3`) does not count.
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.suffixes
            .iter()
            .any(|s| name.len() > s.len() && name.ends_with(s.as_str()))
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| self.matches_name(&n.to_string_lossy()))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.suffixes.is_empty()
    }
}

/// Cooperative cancellation for a running scan.
///
/// `cancel()` is checked between yielded paths; `reset()` clears the flag so
/// the token can be reused.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Walk options for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub extensions: ExtensionSet,
    pub follow_links: bool,
    pub include_hidden: bool,
    pub recursive: bool,
    pub max_depth: Option<usize>,
    /// Lowercased entry names never descended into.
    pub restricted: Vec<String>,
    pub cancel: Option<CancelToken>,
}

impl ScanOptions {
    pub fn new(extensions: ExtensionSet) -> Self {
        Self {
            extensions,
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
            restricted: Vec::new(),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl From<&LibrarySettings> for ScanOptions {
    fn from(settings: &LibrarySettings) -> Self {
        Self {
            extensions: ExtensionSet::new(&settings.extensions),
            follow_links: settings.follow_links,
            include_hidden: settings.include_hidden,
            recursive: settings.recursive,
            max_depth: settings.max_depth,
            restricted: settings
                .restricted_paths
                .iter()
                .map(|r| r.trim().to_lowercase())
                .filter(|r| !r.is_empty())
                .collect(),
            cancel: None,
        }
    }
}

/// A drained scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub paths: Vec<PathBuf>,
    /// Entries that could not be read and were skipped.
    pub skipped: usize,
    /// Whether the walk stopped early because its token was cancelled.
    pub cancelled: bool,
}
