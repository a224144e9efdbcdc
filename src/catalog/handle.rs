use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::model::{
    BackupRun, CatalogStats, ListFilter, ReconcileReport, Track, TrackId, TrackMetadata,
};
use super::snapshot::Snapshot;
use super::store;

/// The connection plus the `data_version` the published snapshot was
/// loaded at.
struct Writer {
    conn: Connection,
    data_version: i64,
}

/// The catalog: durable track records plus the consistent in-memory view
/// readers work from.
///
/// Mutations serialize on the connection mutex, take SQLite's write lock
/// (`BEGIN IMMEDIATE`), commit one transaction and only then publish a new
/// snapshot. Other processes may write the same database file; their commits
/// are picked up before the next mutation and before reads.
pub struct Catalog {
    writer: Mutex<Writer>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Catalog {
    /// Open (creating if needed) the catalog stored at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = store::open(path)?;
        let catalog = Self::from_connection(conn)?;
        info!(path = %path.display(), tracks = catalog.current().len(), "catalog opened");
        Ok(catalog)
    }

    /// A throwaway catalog backed by an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(store::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let data_version = store::data_version(&conn)?;
        let snapshot = Snapshot::from_tracks(store::load_all(&conn)?);
        Ok(Self {
            writer: Mutex::new(Writer { conn, data_version }),
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// The current consistent view. Cheap; clones an `Arc`.
    ///
    /// Reloads first if another connection has committed since the last
    /// load, unless a writer is busy (it will publish on its own).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.refresh();
        self.current()
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, next: Arc<Snapshot>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn writer(&self) -> MutexGuard<'_, Writer> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self) {
        let mut w = match self.writer.try_lock() {
            Ok(w) => w,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        let Writer { conn, data_version } = &mut *w;
        if let Err(e) = self.sync_with_store(conn, data_version) {
            warn!("could not check catalog for outside changes: {e}");
        }
    }

    /// The snapshot matching what is committed in the store, reloading it if
    /// another connection wrote since `seen` was recorded. Inside an
    /// immediate transaction nobody else can commit until we are done.
    fn sync_with_store(&self, conn: &Connection, seen: &mut i64) -> Result<Arc<Snapshot>> {
        let version = store::data_version(conn)?;
        if version == *seen {
            return Ok(self.current());
        }
        let fresh = Arc::new(Snapshot::from_tracks(store::load_all(conn)?));
        debug!(tracks = fresh.len(), "catalog changed by another connection; reloaded");
        *seen = version;
        self.publish(Arc::clone(&fresh));
        Ok(fresh)
    }

    pub fn get(&self, id: TrackId) -> Result<Track> {
        self.snapshot().get(id).cloned().ok_or(Error::NotFound(id))
    }

    pub fn list(&self, filter: ListFilter) -> Vec<Track> {
        self.snapshot().list(filter)
    }

    pub fn stats(&self) -> CatalogStats {
        self.snapshot().stats()
    }

    /// Bring the catalog in line with one completed scan.
    ///
    /// `metadata_lookup` is called once per scanned path before the writer
    /// lock is taken, so slow tag reads never hold up other writers.
    ///
    /// Fails with `Error::Invariant` if a path is relative, not valid UTF-8, or
    /// appears twice; nothing is changed in that case.
    pub fn reconcile<I, F>(&self, scanned_paths: I, mut metadata_lookup: F) -> Result<ReconcileReport>
    where
        I: IntoIterator<Item = PathBuf>,
        F: FnMut(&Path) -> TrackMetadata,
    {
        let mut seen_paths: HashSet<PathBuf> = HashSet::new();
        let mut candidates: Vec<(PathBuf, String)> = Vec::new();
        for path in scanned_paths {
            if !path.is_absolute() {
                return Err(Error::Invariant(format!(
                    "scanned path {} is not absolute",
                    path.display()
                )));
            }
            let Some(key) = path.to_str().map(str::to_owned) else {
                return Err(Error::Invariant(format!(
                    "scanned path {} is not valid UTF-8",
                    path.display()
                )));
            };
            if !seen_paths.insert(path.clone()) {
                return Err(Error::Invariant(format!(
                    "path {} reported twice in one scan",
                    path.display()
                )));
            }
            candidates.push((path, key));
        }

        let candidates: Vec<(PathBuf, String, TrackMetadata)> = candidates
            .into_iter()
            .map(|(path, key)| {
                let meta = metadata_lookup(&path).normalized();
                (path, key, meta)
            })
            .collect();

        let mut w = self.writer();
        let Writer { conn, data_version } = &mut *w;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = self.sync_with_store(&tx, data_version)?;
        let mut next = (*current).clone();
        let mut report = ReconcileReport::default();
        let mut observed: HashSet<TrackId> = HashSet::new();
        let now = Utc::now().trunc_subsecs(3);

        for (path, key, meta) in candidates {
            match current.by_path(&path) {
                Some(existing) => {
                    store::mark_seen(&tx, existing.id, &meta)?;
                    if existing.present {
                        report.updated += 1;
                    } else {
                        debug!(id = %existing.id, path = %path.display(), "track reappeared");
                        report.revived += 1;
                    }
                    observed.insert(existing.id);
                    let mut track = existing.clone();
                    apply_metadata(&mut track, meta);
                    track.present = true;
                    next.insert(track);
                }
                None => {
                    let id = store::insert_track(&tx, &key, &meta, now)?;
                    debug!(%id, path = %path.display(), "track added");
                    report.added += 1;
                    observed.insert(id);
                    let mut track = Track {
                        id,
                        path,
                        title: None,
                        artist: None,
                        album: None,
                        duration: None,
                        size: None,
                        format: None,
                        added_at: now,
                        last_backup: None,
                        present: true,
                    };
                    apply_metadata(&mut track, meta);
                    next.insert(track);
                }
            }
        }

        let gone: Vec<TrackId> = current
            .present()
            .map(|t| t.id)
            .filter(|id| !observed.contains(id))
            .collect();
        for id in gone {
            store::mark_missing(&tx, id)?;
            if let Some(t) = next.get_mut(id) {
                debug!(%id, path = %t.path.display(), "track missing");
                t.present = false;
            }
            report.missing += 1;
        }
        // Flipping `present` may change which record a path resolves to.
        next.reindex();

        tx.commit()?;
        self.publish(Arc::new(next));
        drop(w);

        info!(
            added = report.added,
            updated = report.updated,
            revived = report.revived,
            missing = report.missing,
            "reconcile complete"
        );
        Ok(report)
    }

    /// Record a successful backup of `id` finished at `at`.
    ///
    /// `last_backup` only ever moves forward: an older `at` leaves it as is.
    /// Returns the resulting `last_backup`.
    pub fn record_backup(&self, id: TrackId, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let at = at.trunc_subsecs(3);
        let mut w = self.writer();
        let Writer { conn, data_version } = &mut *w;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = self.sync_with_store(&tx, data_version)?;
        let existing = current.get(id).ok_or(Error::NotFound(id))?;

        if let Some(prev) = existing.last_backup.filter(|prev| *prev >= at) {
            debug!(%id, %at, "backup timestamp not newer; keeping existing");
            return Ok(prev);
        }

        if store::advance_last_backup(&tx, id, at)? == 0 {
            return Err(Error::Invariant(format!(
                "track {id} could not move last_backup from {:?} to {at}",
                existing.last_backup
            )));
        }
        tx.commit()?;

        let mut next = (*current).clone();
        if let Some(t) = next.get_mut(id) {
            t.last_backup = Some(at);
        }
        self.publish(Arc::new(next));
        drop(w);

        debug!(%id, %at, "backup recorded");
        Ok(at)
    }

    /// Permanently drop a record. This is the only way a track ever leaves
    /// the catalog; its id is not handed out again.
    pub fn forget(&self, id: TrackId) -> Result<Track> {
        let mut w = self.writer();
        let Writer { conn, data_version } = &mut *w;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = self.sync_with_store(&tx, data_version)?;
        if current.get(id).is_none() {
            return Err(Error::NotFound(id));
        }

        if store::delete_track(&tx, id)? == 0 {
            warn!(%id, "track vanished from store before delete");
        }
        tx.commit()?;

        let mut next = (*current).clone();
        let removed = next.remove(id).ok_or(Error::NotFound(id))?;
        self.publish(Arc::new(next));
        drop(w);

        info!(%id, path = %removed.path.display(), "track forgotten");
        Ok(removed)
    }

    /// Append one entry to the backup run log.
    pub fn record_run(&self, run: &BackupRun) -> Result<()> {
        let w = self.writer();
        store::insert_run(&w.conn, run)?;
        debug!(status = %run.status, backed_up = run.backed_up, "backup run logged");
        Ok(())
    }

    /// The most recently logged backup run, if any.
    pub fn last_run(&self) -> Result<Option<BackupRun>> {
        let w = self.writer();
        Ok(store::latest_run(&w.conn)?)
    }
}

fn apply_metadata(track: &mut Track, meta: TrackMetadata) {
    track.title = meta.title;
    track.artist = meta.artist;
    track.album = meta.album;
    track.duration = meta.duration;
    track.size = meta.size;
    track.format = meta.format;
}
