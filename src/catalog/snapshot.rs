use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use super::model::{CatalogStats, ListFilter, Track, TrackId};

/// Immutable view of the whole catalog at one point in time.
///
/// Writers build a new snapshot and swap it in; readers hold an `Arc` to
/// whichever one was current when they asked. Records are shared between
/// successive snapshots, so cloning one copies pointers, not tracks.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    tracks: BTreeMap<TrackId, Arc<Track>>,
    by_path: HashMap<Arc<Path>, TrackId>,
}

impl Snapshot {
    pub(super) fn from_tracks(tracks: impl IntoIterator<Item = Track>) -> Self {
        let mut snap = Self::default();
        for t in tracks {
            snap.insert(t);
        }
        snap
    }

    /// Insert or replace a track, keeping the path index pointed at the record
    /// reconcile should reuse: the present one, else the newest retained one.
    pub(super) fn insert(&mut self, track: Track) {
        let wins = match self.by_path(&track.path) {
            None => true,
            Some(cur) if cur.id == track.id => true,
            Some(cur) => (track.present, track.id) > (cur.present, cur.id),
        };
        if wins {
            self.by_path.insert(Arc::from(track.path.as_path()), track.id);
        }
        self.tracks.insert(track.id, Arc::new(track));
    }

    pub(super) fn remove(&mut self, id: TrackId) -> Option<Track> {
        let track = self.tracks.remove(&id)?;
        if self.by_path.get(track.path.as_path()) == Some(&id) {
            self.by_path.remove(track.path.as_path());
            // Fall back to another retained record with the same path, if any.
            let other = self
                .tracks
                .values()
                .filter(|t| t.path == track.path)
                .max_by_key(|t| (t.present, t.id))
                .map(|t| t.id);
            if let Some(other) = other {
                self.by_path.insert(Arc::from(track.path.as_path()), other);
            }
        }
        Some(Arc::unwrap_or_clone(track))
    }

    /// Rebuild the path index after presence flags changed.
    pub(super) fn reindex(&mut self) {
        let mut winners: HashMap<&Path, &Track> = HashMap::new();
        for t in self.tracks.values().map(Arc::as_ref) {
            let slot = winners.entry(t.path.as_path()).or_insert(t);
            if (t.present, t.id) > (slot.present, slot.id) {
                *slot = t;
            }
        }
        let by_path = winners
            .into_values()
            .map(|t| (Arc::from(t.path.as_path()), t.id))
            .collect();
        self.by_path = by_path;
    }

    /// Copy-on-write access to one record.
    pub(super) fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&id).map(Arc::make_mut)
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id).map(Arc::as_ref)
    }

    /// The record a scan of `path` maps onto, present or retained.
    pub fn by_path(&self, path: &Path) -> Option<&Track> {
        self.by_path.get(path).and_then(|id| self.get(*id))
    }

    /// Tracks in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values().map(Arc::as_ref)
    }

    pub fn present(&self) -> impl Iterator<Item = &Track> {
        self.iter().filter(|t| t.present)
    }

    pub fn list(&self, filter: ListFilter) -> Vec<Track> {
        match filter {
            ListFilter::PresentOnly => self.present().cloned().collect(),
            ListFilter::All => self.iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            total: self.tracks.len(),
            ..CatalogStats::default()
        };
        for t in self.iter() {
            if t.present {
                stats.present += 1;
            } else {
                stats.missing += 1;
            }
            if t.last_backup.is_none() {
                stats.never_backed_up += 1;
            }
        }
        stats
    }
}
