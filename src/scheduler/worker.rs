//! The boundary to whatever actually copies files somewhere safe.

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::catalog::Track;

pub type WorkerError = Box<dyn std::error::Error + Send + Sync>;

/// Performs the backup of one track.
///
/// On success returns the completion time to record. On failure the track is
/// left alone and will be due again on the next poll; retry policy belongs to
/// the implementation.
pub trait BackupWorker {
    fn back_up(&mut self, track: &Track) -> Result<DateTime<Utc>, WorkerError>;

    /// Where backups go, for the run log.
    fn target(&self) -> Option<String> {
        None
    }
}

/// Runs an external program per track, e.g. `rsync -a {path} /mnt/backup/`.
///
/// Every `{path}` argument is replaced by the track path; with no placeholder
/// the path is appended. Exit status 0 counts as success.
#[derive(Debug, Clone)]
pub struct CommandWorker {
    program: String,
    args: Vec<String>,
}

impl CommandWorker {
    /// `None` if `command` is empty.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn command_for(&self, path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        let mut substituted = false;
        for arg in &self.args {
            if arg.contains("{path}") {
                cmd.arg(arg.replace("{path}", &path.to_string_lossy()));
                substituted = true;
            } else {
                cmd.arg(arg);
            }
        }
        if !substituted {
            cmd.arg(path);
        }
        cmd
    }
}

impl BackupWorker for CommandWorker {
    fn back_up(&mut self, track: &Track) -> Result<DateTime<Utc>, WorkerError> {
        debug!(id = %track.id, program = %self.program, "running backup command");
        let status = self.command_for(&track.path).status()?;
        if status.success() {
            Ok(Utc::now())
        } else {
            Err(format!("{} exited with {status}", self.program).into())
        }
    }

    fn target(&self) -> Option<String> {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        Some(line)
    }
}
