//! SQLite persistence for the `tracks` table.
//!
//! Everything here is plain statement plumbing; the decisions about what to
//! insert, refresh or flag live in `Catalog`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, ffi, params};

use super::model::{BackupRun, RunStatus, Track, TrackId, TrackMetadata};

pub(super) fn open(path: &Path) -> Result<Connection, rusqlite::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|err| {
            rusqlite::Error::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_CANTOPEN),
                Some(format!(
                    "failed to create parent directory {} for {}: {}",
                    parent.display(),
                    path.display(),
                    err
                )),
            )
        })?;
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    migrate(&conn)?;
    Ok(conn)
}

pub(super) fn open_in_memory() -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open_in_memory()?;
    migrate(&conn)?;
    Ok(conn)
}

// AUTOINCREMENT keeps SQLite from handing out the id of a forgotten row again.
fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tracks (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            path        TEXT NOT NULL,
            title       TEXT,
            artist      TEXT,
            album       TEXT,
            duration_ms INTEGER,
            size        INTEGER,
            format      TEXT,
            added_at    INTEGER NOT NULL,
            last_backup INTEGER,
            present     INTEGER NOT NULL DEFAULT 1 CHECK (present IN (0, 1))
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_tracks_present_path
            ON tracks(path) WHERE present = 1;
        CREATE INDEX IF NOT EXISTS idx_tracks_path ON tracks(path);
        CREATE TABLE IF NOT EXISTS backup_runs (
            id          INTEGER PRIMARY KEY,
            ran_at INTEGER NOT NULL,
            status      TEXT NOT NULL,
            due         INTEGER NOT NULL,
            backed_up   INTEGER NOT NULL,
            failed      INTEGER NOT NULL,
            target      TEXT
        );
        PRAGMA user_version = 2;",
    )?;
    Ok(())
}

fn millis_to_utc(idx: usize, ms: i64) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

fn track_from_row(row: &Row<'_>) -> Result<Track, rusqlite::Error> {
    let path: String = row.get(1)?;
    let duration_ms: Option<i64> = row.get(5)?;
    let size: Option<i64> = row.get(6)?;
    let last_backup = match row.get::<_, Option<i64>>(9)? {
        Some(ms) => Some(millis_to_utc(9, ms)?),
        None => None,
    };

    Ok(Track {
        id: TrackId(row.get(0)?),
        path: PathBuf::from(path),
        title: row.get(2)?,
        artist: row.get(3)?,
        album: row.get(4)?,
        duration: duration_ms.map(|ms| Duration::from_millis(ms.max(0) as u64)),
        size: size.map(|s| s.max(0) as u64),
        format: row.get(7)?,
        added_at: millis_to_utc(8, row.get(8)?)?,
        last_backup,
        present: row.get(10)?,
    })
}

const TRACK_COLUMNS: &str = "id, path, title, artist, album, duration_ms, size, format, \
                             added_at, last_backup, present";

pub(super) fn load_all(conn: &Connection) -> Result<Vec<Track>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("SELECT {TRACK_COLUMNS} FROM tracks ORDER BY id"))?;
    let rows = stmt.query_map([], track_from_row)?;

    let mut tracks = Vec::new();
    for track in rows {
        tracks.push(track?);
    }
    Ok(tracks)
}

fn duration_ms(meta: &TrackMetadata) -> Option<i64> {
    meta.duration
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

pub(super) fn insert_track(
    conn: &Connection,
    path: &str,
    meta: &TrackMetadata,
    added_at: DateTime<Utc>,
) -> Result<TrackId, rusqlite::Error> {
    conn.execute(
        "INSERT INTO tracks (path, title, artist, album, duration_ms, size, format, added_at, present)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)",
        params![
            path,
            meta.title,
            meta.artist,
            meta.album,
            duration_ms(meta),
            meta.size.map(|s| i64::try_from(s).unwrap_or(i64::MAX)),
            meta.format,
            added_at.timestamp_millis(),
        ],
    )?;
    Ok(TrackId(conn.last_insert_rowid()))
}

/// Refresh metadata of a re-observed track and flag it present.
pub(super) fn mark_seen(
    conn: &Connection,
    id: TrackId,
    meta: &TrackMetadata,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE tracks
         SET title = ?2, artist = ?3, album = ?4, duration_ms = ?5, size = ?6, format = ?7,
             present = 1
         WHERE id = ?1",
        params![
            id.0,
            meta.title,
            meta.artist,
            meta.album,
            duration_ms(meta),
            meta.size.map(|s| i64::try_from(s).unwrap_or(i64::MAX)),
            meta.format,
        ],
    )
}

pub(super) fn mark_missing(conn: &Connection, id: TrackId) -> Result<usize, rusqlite::Error> {
    conn.execute("UPDATE tracks SET present = 0 WHERE id = ?1", params![id.0])
}

/// Move `last_backup` forward to `at`. Returns 0 when the stored value is
/// already at or past `at`.
pub(super) fn advance_last_backup(
    conn: &Connection,
    id: TrackId,
    at: DateTime<Utc>,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE tracks SET last_backup = ?2
         WHERE id = ?1 AND (last_backup IS NULL OR last_backup < ?2)",
        params![id.0, at.timestamp_millis()],
    )
}

pub(super) fn delete_track(conn: &Connection, id: TrackId) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM tracks WHERE id = ?1", params![id.0])
}

/// Changes whenever another connection commits to the database file.
pub(super) fn data_version(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("PRAGMA data_version", [], |row| row.get(0))
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

pub(super) fn insert_run(conn: &Connection, run: &BackupRun) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO backup_runs (ran_at, status, due, backed_up, failed, target)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            run.ran_at.timestamp_millis(),
            run.status.as_str(),
            count(run.due),
            count(run.backed_up),
            count(run.failed),
            run.target,
        ],
    )?;
    Ok(())
}

pub(super) fn latest_run(conn: &Connection) -> Result<Option<BackupRun>, rusqlite::Error> {
    conn.query_row(
        "SELECT ran_at, status, due, backed_up, failed, target
         FROM backup_runs ORDER BY id DESC LIMIT 1",
        [],
        |row| {
            let status: String = row.get(1)?;
            Ok(BackupRun {
                ran_at: millis_to_utc(0, row.get(0)?)?,
                status: RunStatus::parse(&status).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        format!("unknown run status {status:?}").into(),
                    )
                })?,
                due: row.get::<_, i64>(2)?.max(0) as usize,
                backed_up: row.get::<_, i64>(3)?.max(0) as usize,
                failed: row.get::<_, i64>(4)?.max(0) as usize,
                target: row.get(5)?,
            })
        },
    )
    .optional()
}
