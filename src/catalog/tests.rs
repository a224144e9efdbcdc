use super::*;
use crate::error::Error;
use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

fn p(name: &str) -> PathBuf {
    PathBuf::from("/music").join(name)
}

fn no_meta(_: &Path) -> TrackMetadata {
    TrackMetadata::default()
}

fn titled(path: &Path) -> TrackMetadata {
    TrackMetadata {
        title: path.file_stem().and_then(|s| s.to_str()).map(String::from),
        ..TrackMetadata::default()
    }
}

fn present_paths(catalog: &Catalog) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = catalog
        .list(ListFilter::PresentOnly)
        .into_iter()
        .map(|t| t.path)
        .collect();
    paths.sort();
    paths
}

#[test]
fn reconcile_then_list_round_trips_scanned_paths() {
    let catalog = Catalog::open_in_memory().unwrap();
    let scan = vec![p("b.mp3"), p("a.wav"), p("sub/c.ogg")];

    let report = catalog.reconcile(scan.clone(), no_meta).unwrap();
    assert_eq!(report.added, 3);

    let mut expected = scan;
    expected.sort();
    assert_eq!(present_paths(&catalog), expected);

    let report = catalog.reconcile(vec![p("a.wav")], no_meta).unwrap();
    assert_eq!(
        report,
        ReconcileReport {
            added: 0,
            updated: 1,
            revived: 0,
            missing: 2,
        }
    );
    assert_eq!(present_paths(&catalog), vec![p("a.wav")]);
    assert_eq!(catalog.list(ListFilter::All).len(), 3);
}

#[test]
fn new_tracks_start_never_backed_up() {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.reconcile(vec![p("a.mp3")], titled).unwrap();

    let t = &catalog.list(ListFilter::All)[0];
    assert!(t.present);
    assert_eq!(t.last_backup, None);
    assert_eq!(t.title.as_deref(), Some("a"));
}

#[test]
fn reconcile_refreshes_metadata_of_known_paths() {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.reconcile(vec![p("song.mp3")], titled).unwrap();
    let id = catalog.list(ListFilter::All)[0].id;

    catalog
        .reconcile(vec![p("song.mp3")], |_: &Path| TrackMetadata {
            title: Some("  Updated Title ".into()),
            artist: Some("   ".into()),
            format: Some("MP3".into()),
            ..TrackMetadata::default()
        })
        .unwrap();

    let t = catalog.get(id).unwrap();
    assert_eq!(t.title.as_deref(), Some("Updated Title"));
    assert_eq!(t.artist, None);
    assert_eq!(t.format.as_deref(), Some("mp3"));
    assert_eq!(catalog.list(ListFilter::All).len(), 1);
}

#[test]
fn absent_then_present_again_reuses_id_and_keeps_backup() {
    let catalog = Catalog::open_in_memory().unwrap();
    let backed_up = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    catalog.reconcile(vec![p("a.mp3"), p("b.mp3")], no_meta).unwrap();
    let a = catalog.snapshot().by_path(&p("a.mp3")).unwrap().id;
    catalog.record_backup(a, backed_up).unwrap();

    catalog.reconcile(vec![p("b.mp3")], no_meta).unwrap();
    let after_gone = catalog.get(a).unwrap();
    assert!(!after_gone.present);
    assert_eq!(after_gone.last_backup, Some(backed_up));

    let report = catalog.reconcile(vec![p("a.mp3"), p("b.mp3")], no_meta).unwrap();
    assert_eq!(report.revived, 1);
    assert_eq!(report.added, 0);

    let back = catalog.get(a).unwrap();
    assert!(back.present);
    assert_eq!(back.last_backup, Some(backed_up));
    assert_eq!(catalog.list(ListFilter::All).len(), 2);
}

#[test]
fn duplicate_path_in_one_scan_is_rejected_without_changes() {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.reconcile(vec![p("keep.mp3")], no_meta).unwrap();

    let err = catalog
        .reconcile(vec![p("x.mp3"), p("x.mp3")], no_meta)
        .unwrap_err();
    assert!(matches!(err, Error::Invariant(_)));
    assert_eq!(present_paths(&catalog), vec![p("keep.mp3")]);
}

#[test]
fn relative_paths_are_rejected() {
    let catalog = Catalog::open_in_memory().unwrap();
    let err = catalog
        .reconcile(vec![PathBuf::from("relative/song.mp3")], no_meta)
        .unwrap_err();
    assert!(matches!(err, Error::Invariant(_)));
    assert!(catalog.snapshot().is_empty());
}

#[test]
fn record_backup_is_monotonic_in_either_order() {
    let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let t2 = t1 + Duration::hours(2);

    let catalog = Catalog::open_in_memory().unwrap();
    catalog.reconcile(vec![p("a.mp3"), p("b.mp3")], no_meta).unwrap();
    let snap = catalog.snapshot();
    let a = snap.by_path(&p("a.mp3")).unwrap().id;
    let b = snap.by_path(&p("b.mp3")).unwrap().id;

    catalog.record_backup(a, t1).unwrap();
    catalog.record_backup(a, t2).unwrap();
    assert_eq!(catalog.get(a).unwrap().last_backup, Some(t2));

    catalog.record_backup(b, t2).unwrap();
    assert_eq!(catalog.record_backup(b, t1).unwrap(), t2);
    assert_eq!(catalog.get(b).unwrap().last_backup, Some(t2));
}

#[test]
fn unknown_ids_are_not_found() {
    let catalog = Catalog::open_in_memory().unwrap();
    let missing = TrackId(42);

    assert!(matches!(catalog.get(missing), Err(Error::NotFound(id)) if id == missing));
    assert!(matches!(
        catalog.record_backup(missing, Utc::now()),
        Err(Error::NotFound(_))
    ));
    assert!(matches!(catalog.forget(missing), Err(Error::NotFound(_))));
}

#[test]
fn forget_removes_record_and_never_reissues_its_id() {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.reconcile(vec![p("a.mp3")], no_meta).unwrap();
    let old = catalog.list(ListFilter::All)[0].id;

    let removed = catalog.forget(old).unwrap();
    assert_eq!(removed.path, p("a.mp3"));
    assert!(catalog.snapshot().is_empty());

    catalog.reconcile(vec![p("a.mp3")], no_meta).unwrap();
    let new = catalog.list(ListFilter::All)[0].id;
    assert!(new > old);
}

#[test]
fn snapshot_taken_before_reconcile_is_unaffected() {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.reconcile(vec![p("a.mp3")], no_meta).unwrap();

    let before = catalog.snapshot();
    catalog.reconcile(vec![p("b.mp3")], no_meta).unwrap();

    assert_eq!(before.present().count(), 1);
    assert_eq!(before.present().next().unwrap().path, p("a.mp3"));
    assert_eq!(present_paths(&catalog), vec![p("b.mp3")]);
}

#[test]
fn stats_count_presence_and_backup_state() {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog
        .reconcile(vec![p("a.mp3"), p("b.mp3"), p("c.mp3")], no_meta)
        .unwrap();
    let a = catalog.snapshot().by_path(&p("a.mp3")).unwrap().id;
    catalog.record_backup(a, Utc::now()).unwrap();
    catalog.reconcile(vec![p("a.mp3"), p("b.mp3")], no_meta).unwrap();

    assert_eq!(
        catalog.stats(),
        CatalogStats {
            total: 3,
            present: 2,
            missing: 1,
            never_backed_up: 2,
        }
    );
}

#[test]
fn catalog_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("nested").join("catalog.sqlite3");
    let at = Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap();

    let id = {
        let catalog = Catalog::open(&db).unwrap();
        catalog
            .reconcile(vec![p("a.flac"), p("b.flac")], |path: &Path| TrackMetadata {
                artist: Some("Artist".into()),
                duration: Some(std::time::Duration::from_millis(181_500)),
                size: Some(5000),
                ..titled(path)
            })
            .unwrap();
        catalog.reconcile(vec![p("a.flac")], no_meta).unwrap();
        let id = catalog.snapshot().by_path(&p("b.flac")).unwrap().id;
        catalog.record_backup(id, at).unwrap();
        id
    };

    let reopened = Catalog::open(&db).unwrap();
    let b = reopened.get(id).unwrap();
    assert!(!b.present);
    assert_eq!(b.last_backup, Some(at));
    assert_eq!(b.title.as_deref(), Some("b"));
    assert_eq!(b.artist.as_deref(), Some("Artist"));
    assert_eq!(b.duration, Some(std::time::Duration::from_millis(181_500)));
    assert_eq!(b.size, Some(5000));
    assert_eq!(present_paths(&reopened), vec![p("a.flac")]);
}

#[test]
fn concurrent_readers_see_whole_reconciles_only() {
    use std::sync::Arc;
    use std::thread;

    let catalog = Arc::new(Catalog::open_in_memory().unwrap());
    let even: Vec<PathBuf> = (0..50).map(|i| p(&format!("even-{i}.mp3"))).collect();
    let odd: Vec<PathBuf> = (0..50).map(|i| p(&format!("odd-{i}.mp3"))).collect();

    let writer = {
        let catalog = Arc::clone(&catalog);
        let (even, odd) = (even.clone(), odd.clone());
        thread::spawn(move || {
            for round in 0..20 {
                let scan = if round % 2 == 0 { &even } else { &odd };
                catalog.reconcile(scan.clone(), no_meta).unwrap();
            }
        })
    };

    for _ in 0..200 {
        let snap = catalog.snapshot();
        let present: Vec<&Track> = snap.present().collect();
        if present.is_empty() {
            continue;
        }
        assert_eq!(present.len(), 50);
        let first_even = present[0].path.to_string_lossy().contains("even");
        assert!(
            present
                .iter()
                .all(|t| t.path.to_string_lossy().contains("even") == first_even)
        );
    }

    writer.join().unwrap();
}

#[test]
fn record_backup_shares_untouched_records_with_previous_snapshot() {
    let catalog = Catalog::open_in_memory().unwrap();
    catalog.reconcile(vec![p("a.mp3"), p("b.mp3")], titled).unwrap();
    let before = catalog.snapshot();
    let a = before.by_path(&p("a.mp3")).unwrap().id;
    let b = before.by_path(&p("b.mp3")).unwrap().id;

    catalog.record_backup(a, Utc::now()).unwrap();
    let after = catalog.snapshot();

    assert!(std::ptr::eq(before.get(b).unwrap(), after.get(b).unwrap()));
    assert!(!std::ptr::eq(before.get(a).unwrap(), after.get(a).unwrap()));
    assert_eq!(before.get(a).unwrap().last_backup, None);
}

#[test]
fn two_handles_on_one_file_see_each_others_writes() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("catalog.sqlite3");
    let daemon = Catalog::open(&db).unwrap();
    let cli = Catalog::open(&db).unwrap();
    let x = p("x.mp3");

    cli.reconcile(vec![x.clone()], no_meta).unwrap();
    let report = daemon.reconcile(vec![x.clone()], no_meta).unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(report.updated, 1);

    let id = cli.snapshot().by_path(&x).unwrap().id;
    assert_eq!(daemon.snapshot().by_path(&x).unwrap().id, id);

    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    cli.record_backup(id, at).unwrap();
    assert_eq!(daemon.get(id).unwrap().last_backup, Some(at));
    assert_eq!(
        daemon.record_backup(id, at - Duration::hours(1)).unwrap(),
        at
    );

    cli.forget(id).unwrap();
    assert!(matches!(daemon.get(id), Err(Error::NotFound(_))));
    assert!(matches!(
        daemon.record_backup(id, at),
        Err(Error::NotFound(_))
    ));

    let report = daemon.reconcile(vec![x.clone()], no_meta).unwrap();
    assert_eq!(report.added, 1);
    let new_id = daemon.snapshot().by_path(&x).unwrap().id;
    assert!(new_id > id);
    assert_eq!(cli.get(new_id).unwrap().path, x);
}

#[test]
fn failed_reconcile_leaves_store_and_view_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("catalog.sqlite3");
    let catalog = Catalog::open(&db).unwrap();
    catalog.reconcile(vec![p("a.mp3"), p("b.mp3")], no_meta).unwrap();
    let a = catalog.snapshot().by_path(&p("a.mp3")).unwrap().id;
    catalog.record_backup(a, Utc::now()).unwrap();

    rusqlite::Connection::open(&db)
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_bad_path BEFORE INSERT ON tracks
             WHEN NEW.path LIKE '%/bad.mp3'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
    let before = catalog.list(ListFilter::All);

    // `a` is refreshed and `c` inserted before the insert of `bad` fails.
    let err = catalog
        .reconcile(vec![p("a.mp3"), p("c.mp3"), p("bad.mp3")], titled)
        .unwrap_err();
    assert!(matches!(err, Error::Storage(_)));

    assert_eq!(catalog.list(ListFilter::All), before);
    assert_eq!(Catalog::open(&db).unwrap().list(ListFilter::All), before);
}

#[test]
fn backup_run_log_returns_latest_entry() {
    let catalog = Catalog::open_in_memory().unwrap();
    assert_eq!(catalog.last_run().unwrap(), None);

    let first = BackupRun {
        ran_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        status: RunStatus::Failed,
        due: 3,
        backed_up: 2,
        failed: 1,
        target: None,
    };
    let second = BackupRun {
        ran_at: Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
        status: RunStatus::Success,
        due: 1,
        backed_up: 1,
        failed: 0,
        target: Some("/mnt/backup".into()),
    };
    catalog.record_run(&first).unwrap();
    catalog.record_run(&second).unwrap();

    assert_eq!(catalog.last_run().unwrap(), Some(second));
}
