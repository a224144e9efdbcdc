use chrono::{DateTime, TimeDelta, Utc};

use crate::catalog::{Catalog, Snapshot, Track, TrackId};
use crate::config::BackupSettings;
use crate::error::Result;

/// Whether `track` needs a backup at `now`.
///
/// Elapsed time is clamped at zero, so a `last_backup` in the future (clock
/// skew) is never due. The comparison is strict: exactly `threshold` old is
/// not yet due.
pub fn is_due(track: &Track, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
    if !track.present {
        return false;
    }
    match track.last_backup {
        None => true,
        Some(last) => {
            let elapsed = (now - last).max(TimeDelta::zero());
            elapsed > threshold.max(TimeDelta::zero())
        }
    }
}

/// Every due track in `snapshot`, never-backed-up first, then oldest backup
/// first, ties broken by id.
pub fn due(snapshot: &Snapshot, now: DateTime<Utc>, threshold: TimeDelta) -> Vec<Track> {
    let mut due: Vec<Track> = snapshot
        .present()
        .filter(|t| is_due(t, now, threshold))
        .cloned()
        .collect();
    due.sort_by_key(|t| (t.last_backup, t.id));
    due
}

/// Time-based backup policy over a catalog.
///
/// Holds nothing but its threshold; all state lives in the `Catalog`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BackupScheduler {
    threshold: TimeDelta,
}

impl BackupScheduler {
    pub fn new(threshold: TimeDelta) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> TimeDelta {
        self.threshold
    }

    /// Tracks due at `now`. Read-only and repeatable.
    pub fn due(&self, catalog: &Catalog, now: DateTime<Utc>) -> Vec<Track> {
        due(&catalog.snapshot(), now, self.threshold)
    }

    /// Record that `id` was backed up at `at`.
    pub fn record_completion(
        &self,
        catalog: &Catalog,
        id: TrackId,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        catalog.record_backup(id, at)
    }
}

impl From<&BackupSettings> for BackupScheduler {
    fn from(settings: &BackupSettings) -> Self {
        let secs = i64::try_from(settings.threshold_secs).unwrap_or(i64::MAX);
        Self::new(TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX))
    }
}
