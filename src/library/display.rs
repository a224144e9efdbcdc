use crate::catalog::Track;
use crate::config::TrackDisplayField;

/// Build a one-line description of a track from the configured `fields`.
///
/// Blank fields are left out; if nothing is left the file path is used.
pub fn display_from_fields(track: &Track, fields: &[TrackDisplayField], sep: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    for f in fields {
        match f {
            TrackDisplayField::Id => parts.push(track.id.to_string()),
            TrackDisplayField::Title => {
                if let Some(t) = track.title.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    parts.push(t.to_string());
                }
            }
            TrackDisplayField::Artist => {
                if let Some(a) = track.artist.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    parts.push(a.to_string());
                }
            }
            TrackDisplayField::Album => {
                if let Some(a) = track.album.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    parts.push(a.to_string());
                }
            }
            TrackDisplayField::Filename => {
                if let Some(stem) = track.path.file_stem().and_then(|s| s.to_str()) {
                    if !stem.trim().is_empty() {
                        parts.push(stem.to_string());
                    }
                }
            }
            TrackDisplayField::Path => parts.push(track.path.display().to_string()),
            TrackDisplayField::LastBackup => parts.push(match track.last_backup {
                Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
                None => "never".to_string(),
            }),
        }
    }

    if parts.is_empty() {
        track.path.display().to_string()
    } else {
        parts.join(sep)
    }
}
