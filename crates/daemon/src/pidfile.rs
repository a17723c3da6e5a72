// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID-file interlock.
//!
//! An exclusive advisory file lock plus a pid write guarantees a single
//! live daemon per path. The lock is acquired without blocking; contention
//! means another daemon is live and the caller exits with success.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;
use tracing::warn;

/// Interlock errors.
#[derive(Debug, Error)]
pub enum PidfileError {
    /// The lock is held by another process: another daemon is live.
    #[error("pid file {0} is locked by another process")]
    AlreadyLocked(PathBuf),

    #[error("pid file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
}

/// A held PID-file lock.
///
/// The advisory lock is released when the handle is dropped.
#[derive(Debug)]
pub struct Pidfile {
    path: PathBuf,
    file: File,
}

impl Pidfile {
    /// Open or create the file and acquire the exclusive lock, without
    /// blocking.
    ///
    /// The file is not truncated before the lock is held, so a losing
    /// contender never wipes the live daemon's pid.
    pub fn create(path: &Path) -> Result<Pidfile, PidfileError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| PidfileError::Io(path.to_path_buf(), e))?;

        file.try_lock_exclusive().map_err(|e| {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                PidfileError::AlreadyLocked(path.to_path_buf())
            } else {
                PidfileError::Io(path.to_path_buf(), e)
            }
        })?;

        Ok(Pidfile {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Store the current process id as one decimal line, truncating prior
    /// contents.
    pub fn write(&mut self) -> Result<(), PidfileError> {
        let io = |e| PidfileError::Io(self.path.clone(), e);
        self.file.set_len(0).map_err(io)?;
        self.file.seek(SeekFrom::Start(0)).map_err(io)?;
        writeln!(self.file, "{}", std::process::id()).map_err(io)?;
        self.file.flush().map_err(io)
    }

    /// Unlink the file and release the lock. Unlink failure is logged, not
    /// fatal.
    pub fn remove(self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "failed to unlink pid file: {e}");
        }
        // Lock released when self.file drops.
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
