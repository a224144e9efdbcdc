use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

use super::model::{CancelToken, ExtensionSet, ScanOptions, ScanOutcome};

type Entries = Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>;

/// Lazy walk over one library root, yielding absolute paths of audio files.
///
/// Entries below the root that cannot be read come out as `Err` items; the
/// caller decides whether to skip them or give up. Order is whatever the
/// filesystem hands back.
pub struct Scan {
    root: PathBuf,
    entries: Entries,
    extensions: ExtensionSet,
    cancel: Option<CancelToken>,
    cancelled: bool,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_restricted(entry: &DirEntry, restricted: &[String]) -> bool {
    let name = entry.file_name().to_string_lossy().to_lowercase();
    restricted.iter().any(|r| *r == name)
}

/// Start a fresh traversal of `root`.
///
/// Fails with `Error::Io` before anything is yielded if the root is missing,
/// not a directory, or unreadable.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<Scan> {
    let root = fs::canonicalize(root).map_err(|e| Error::io(root, e))?;
    fs::read_dir(&root).map_err(|e| Error::io(&root, e))?;

    let mut walker = WalkDir::new(&root).follow_links(options.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if options.recursive {
        options.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    let include_hidden = options.include_hidden;
    let restricted = options.restricted.clone();
    let entries = walker.into_iter().filter_entry(move |e| {
        e.depth() == 0 || ((include_hidden || !is_hidden(e)) && !is_restricted(e, &restricted))
    });

    debug!(root = %root.display(), "scan started");
    Ok(Scan {
        root,
        entries: Box::new(entries),
        extensions: options.extensions.clone(),
        cancel: options.cancel.clone(),
        cancelled: false,
    })
}

impl Scan {
    /// The canonical root being walked.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    fn entry_error(&self, err: walkdir::Error) -> Error {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        let source = err
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("filesystem loop"));
        Error::io(path, source)
    }
}

impl Iterator for Scan {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                if !self.cancelled {
                    debug!(root = %self.root.display(), "scan cancelled");
                }
                self.cancelled = true;
                return None;
            }

            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(self.entry_error(err))),
            };

            // Symlinks only count when the walk follows them, in which case
            // walkdir reports the target's type.
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !self.extensions.matches(path) {
                continue;
            }
            if path.to_str().is_none() {
                return Some(Err(Error::io(
                    path,
                    io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
                )));
            }
            return Some(Ok(entry.into_path()));
        }
    }
}

/// Drain a scan, logging and skipping unreadable entries.
pub fn collect_candidates(mut scan: Scan) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    for item in scan.by_ref() {
        match item {
            Ok(path) => outcome.paths.push(path),
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                outcome.skipped += 1;
            }
        }
    }
    outcome.cancelled = scan.was_cancelled();
    debug!(
        root = %scan.root().display(),
        found = outcome.paths.len(),
        skipped = outcome.skipped,
        cancelled = outcome.cancelled,
        "scan finished"
    );
    outcome
}
