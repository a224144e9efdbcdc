use std::fs;
use std::path::Path;

use lofty::prelude::*;
use tracing::trace;

use crate::catalog::TrackMetadata;

/// Read whatever descriptive metadata a file offers.
///
/// Never fails: unreadable tags leave fields empty, and artist and title fall
/// back to the file stem (see `split_stem`). Used as the default lookup for
/// `Catalog::reconcile`.
pub fn read_metadata(path: &Path) -> TrackMetadata {
    let (artist, title) = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(split_stem)
        .unwrap_or((None, None));

    let mut meta = TrackMetadata {
        title,
        artist,
        size: fs::metadata(path).ok().map(|m| m.len()),
        format: path
            .extension()
            .and_then(|s| s.to_str())
            .map(|e| e.to_ascii_lowercase()),
        ..TrackMetadata::default()
    };

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            meta.duration = Some(tagged.properties().duration());

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = tag.title().filter(|v| !v.trim().is_empty()) {
                    meta.title = Some(v.into_owned());
                }
                if let Some(v) = tag.artist().filter(|v| !v.trim().is_empty()) {
                    meta.artist = Some(v.into_owned());
                }
                meta.album = tag.album().map(|v| v.into_owned());
            }
        }
        Err(e) => trace!(path = %path.display(), "no readable tags: {e}"),
    }

    meta
}

/// `"Artist - Title"` file names carry both fields; anything else is just a
/// title.
fn split_stem(stem: &str) -> (Option<String>, Option<String>) {
    match stem.split_once(" - ") {
        Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => {
            (Some(artist.trim().to_string()), Some(title.trim().to_string()))
        }
        _ => (None, Some(stem.to_string())),
    }
}
