use std::path::PathBuf;

use serde::Deserialize;

use super::load::default_data_path;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/musica/config.toml` or `~/.config/musica/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `MUSICA__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub catalog: CatalogSettings,
    pub backup: BackupSettings,
    pub playback: PlaybackSettings,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    Id,
    Title,
    Artist,
    Album,
    Filename,
    Path,
    LastBackup,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory scanned when no root is given on the command line.
    pub root: Option<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, leading dot optional).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Directory names never descended into (exact, case-insensitive match).
    pub restricted_paths: Vec<String>,

    /// Which fields `musica list` prints for each track, and in what order.
    ///
    /// Example: ["id", "artist", "title"] -> "12 - Artist - Title"
    pub display_fields: Vec<TrackDisplayField>,
    /// Separator used to join `display_fields`.
    pub display_separator: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            root: None,
            extensions: ["mp3", "wav", "ogg", "flac", "m4a", "opus"]
                .into_iter()
                .map(String::from)
                .collect(),
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
            restricted_paths: ["node_modules", "System32", "temp", ".git", "AppData"]
                .into_iter()
                .map(String::from)
                .collect(),
            display_fields: vec![
                TrackDisplayField::Id,
                TrackDisplayField::Artist,
                TrackDisplayField::Title,
            ],
            display_separator: " - ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// SQLite file holding the `tracks` table.
    pub db_path: PathBuf,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            db_path: default_data_path()
                .unwrap_or_else(|| PathBuf::from("musica-catalog.sqlite3")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupSettings {
    /// A track is due once its last backup is strictly older than this (seconds).
    pub threshold_secs: u64,
    /// How often `musica poll` recomputes the due set (seconds).
    pub poll_interval_secs: u64,
    /// Whether each poll cycle rescans the library root first.
    pub rescan_on_poll: bool,
    /// External program run by `musica poll` for each due track, e.g.
    /// `["rsync", "-a", "{path}", "/mnt/backup/"]`. Empty = report only.
    pub command: Vec<String>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            threshold_secs: 3600,
            poll_interval_secs: 3600,
            rescan_on_poll: true,
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Output volume in `0.0..=1.0`.
    pub volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self { volume: 0.7 }
    }
}
