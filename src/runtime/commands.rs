use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tracing::{info, warn};

use crate::audio::{Playback, RodioPlayback, play_track};
use crate::catalog::{Catalog, ListFilter, ReconcileReport, Track, TrackId};
use crate::cli::Command;
use crate::config::{LibrarySettings, Settings};
use crate::error::Result;
use crate::library::{ScanOptions, collect_candidates, display_from_fields, read_metadata, scan};
use crate::scheduler::{BackupScheduler, CommandWorker, Poller, run_cycle};

/// Walk `root` and reconcile the catalog with what was found.
///
/// The walk happens before the catalog's writer lock is taken. Unreadable
/// entries are logged and skipped, so tracks under them are flagged missing
/// (never deleted) until a later scan sees them again.
pub fn sync_library(catalog: &Catalog, root: &Path, library: &LibrarySettings) -> Result<ReconcileReport> {
    let options = ScanOptions::from(library);
    let outcome = collect_candidates(scan(root, &options)?);
    if outcome.skipped > 0 {
        warn!(skipped = outcome.skipped, "some entries could not be read");
    }
    catalog.reconcile(outcome.paths, read_metadata)
}

fn library_root(explicit: Option<PathBuf>, settings: &Settings) -> PathBuf {
    explicit
        .or_else(|| settings.library.root.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_track(track: &Track, settings: &Settings) {
    println!(
        "{}",
        display_from_fields(
            track,
            &settings.library.display_fields,
            &settings.library.display_separator
        )
    );
}

pub fn execute(command: Command, catalog: &Arc<Catalog>, settings: &Settings) -> Result<()> {
    let scheduler = BackupScheduler::from(&settings.backup);

    match command {
        Command::Scan { root } => {
            let root = library_root(root, settings);
            let report = sync_library(catalog, &root, &settings.library)?;
            println!(
                "added {}, updated {}, revived {}, missing {}",
                report.added, report.updated, report.revived, report.missing
            );
        }
        Command::List { all } => {
            let filter = if all { ListFilter::All } else { ListFilter::PresentOnly };
            for track in catalog.list(filter) {
                print_track(&track, settings);
            }
        }
        Command::Show { id } => {
            let t = catalog.get(TrackId(id))?;
            println!("id:          {}", t.id);
            println!("path:        {}", t.path.display());
            println!("title:       {}", t.title.as_deref().unwrap_or("-"));
            println!("artist:      {}", t.artist.as_deref().unwrap_or("-"));
            println!("album:       {}", t.album.as_deref().unwrap_or("-"));
            println!("format:      {}", t.format.as_deref().unwrap_or("-"));
            if let Some(d) = t.duration {
                println!("duration:    {}:{:02}", d.as_secs() / 60, d.as_secs() % 60);
            }
            if let Some(size) = t.size {
                println!("size:        {size} bytes");
            }
            println!("added:       {}", t.added_at.to_rfc3339());
            match t.last_backup {
                Some(at) => println!("last backup: {}", at.to_rfc3339()),
                None => println!("last backup: never"),
            }
            println!("present:     {}", t.present);
        }
        Command::Due { threshold } => {
            let scheduler = match threshold {
                Some(secs) => BackupScheduler::new(
                    TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
                        .unwrap_or(TimeDelta::MAX),
                ),
                None => scheduler,
            };
            for track in scheduler.due(catalog, Utc::now()) {
                print_track(&track, settings);
            }
        }
        Command::Mark { id, at } => {
            let recorded = scheduler.record_completion(catalog, TrackId(id), at.unwrap_or_else(Utc::now))?;
            println!("track {id} last backup: {}", recorded.to_rfc3339());
        }
        Command::Forget { id } => {
            let removed = catalog.forget(TrackId(id))?;
            println!("forgot track {id} ({})", removed.path.display());
        }
        Command::Status => {
            let stats = catalog.stats();
            let due = scheduler.due(catalog, Utc::now()).len();
            println!("tracks:          {}", stats.total);
            println!("present:         {}", stats.present);
            println!("missing:         {}", stats.missing);
            println!("never backed up: {}", stats.never_backed_up);
            println!("due now:         {due}");
            match catalog.last_run()? {
                Some(run) => println!(
                    "last backup run: {} ({}, {}/{} tracks{})",
                    run.ran_at.to_rfc3339(),
                    run.status,
                    run.backed_up,
                    run.due,
                    run.target.map(|t| format!(" via {t}")).unwrap_or_default()
                ),
                None => println!("last backup run: never"),
            }
        }
        Command::Poll { once } => poll(Arc::clone(catalog), settings.clone(), scheduler, once)?,
        Command::Play { id } => {
            let mut player = RodioPlayback::new(settings.playback.volume)?;
            let track = play_track(&mut player, catalog, TrackId(id))?;
            info!(id = %track.id, path = %track.path.display(), "playing");
            player.wait_until_end();
            player.stop();
        }
    }
    Ok(())
}

fn poll_cycle(
    catalog: &Catalog,
    settings: &Settings,
    scheduler: &BackupScheduler,
    worker: Option<&mut CommandWorker>,
) -> Result<()> {
    if settings.backup.rescan_on_poll {
        match settings.library.root.as_deref() {
            Some(root) => {
                if let Err(e) = sync_library(catalog, root, &settings.library) {
                    warn!("rescan failed, using existing catalog: {e}");
                }
            }
            None => warn!("backup.rescan_on_poll is set but library.root is not"),
        }
    }

    match worker {
        Some(worker) => {
            run_cycle(catalog, scheduler, worker, Utc::now())?;
        }
        None => {
            let due = scheduler.due(catalog, Utc::now());
            info!(due = due.len(), "no backup.command configured; reporting only");
            for t in &due {
                info!(id = %t.id, path = %t.path.display(), "due");
            }
        }
    }
    Ok(())
}

fn poll(catalog: Arc<Catalog>, settings: Settings, scheduler: BackupScheduler, once: bool) -> Result<()> {
    let mut worker = CommandWorker::new(&settings.backup.command);

    if once {
        return poll_cycle(&catalog, &settings, &scheduler, worker.as_mut());
    }

    let interval = Duration::from_secs(settings.backup.poll_interval_secs);
    info!(every = ?interval, "polling for due backups");
    let poller = Poller::spawn(interval, move || {
        if let Err(e) = poll_cycle(&catalog, &settings, &scheduler, worker.as_mut()) {
            warn!("backup cycle aborted: {e}");
        }
    });
    poller.wait();
    Ok(())
}
