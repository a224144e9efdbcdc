use std::any::Any;
use std::sync::Mutex;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::catalog::{BackupRun, Catalog, RunStatus};
use crate::error::Result;

use super::policy::BackupScheduler;
use super::worker::BackupWorker;

/// What one poll cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub due: usize,
    pub backed_up: usize,
    pub failed: usize,
}

/// Hand every track due at `now` to `worker` and record the ones it finished.
///
/// Worker failures are logged and counted; the track stays due. Catalog
/// errors abort the cycle. A cycle with anything due is appended to the
/// catalog's run log.
pub fn run_cycle<W: BackupWorker + ?Sized>(
    catalog: &Catalog,
    scheduler: &BackupScheduler,
    worker: &mut W,
    now: DateTime<Utc>,
) -> Result<CycleReport> {
    let due = scheduler.due(catalog, now);
    let mut report = CycleReport {
        due: due.len(),
        ..CycleReport::default()
    };

    for track in &due {
        match worker.back_up(track) {
            Ok(done_at) => {
                scheduler.record_completion(catalog, track.id, done_at)?;
                report.backed_up += 1;
            }
            Err(e) => {
                warn!(id = %track.id, path = %track.path.display(), "backup failed: {e}");
                report.failed += 1;
            }
        }
    }

    info!(
        due = report.due,
        backed_up = report.backed_up,
        failed = report.failed,
        "backup cycle finished"
    );
    if report.due > 0 {
        catalog.record_run(&BackupRun {
            ran_at: now,
            status: if report.failed == 0 {
                RunStatus::Success
            } else {
                RunStatus::Failed
            },
            due: report.due,
            backed_up: report.backed_up,
            failed: report.failed,
            target: worker.target(),
        })?;
    }
    Ok(report)
}

/// Background thread that calls `tick` once immediately and then every
/// `interval` until stopped.
pub struct Poller {
    tx: Sender<()>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn spawn<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                tick();
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("poller stopped");
        });

        Self {
            tx,
            join: Mutex::new(Some(handle)),
        }
    }

    /// Ask the thread to stop and wait for the current tick to finish.
    pub fn stop(&self) {
        let _ = self.tx.send(());
        self.wait();
    }

    /// Block until the poller thread exits (after `stop` from elsewhere).
    pub fn wait(&self) {
        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                if let Err(panic) = h.join() {
                    warn!("poller thread panicked: {}", panic_message(panic.as_ref()));
                }
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
