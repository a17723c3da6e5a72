// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup with a reopenable file writer.
//!
//! The writer holds the open log file behind a mutex so SIGHUP can reopen
//! it in place (for rotation by external tools) without tearing down the
//! subscriber.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::config::{Config, LogLevel};

/// Default log locations tried when `--logfile` is unset.
pub const DEFAULT_LOG_PATHS: [&str; 2] = ["/var/log/beacon/beacond.log", "/var/log/beacond.log"];

/// Logging errors.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("log file {0} is not writable: {1}")]
    Unwritable(PathBuf, #[source] std::io::Error),

    #[error("logging already initialized")]
    AlreadyInitialized,
}

/// Handle to the live log file; lets SIGHUP reopen it.
#[derive(Debug, Clone)]
pub struct LogHandle {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl LogHandle {
    /// Reopen the log file at the original path; best-effort.
    pub fn reopen(&self) {
        match open_append(&self.path) {
            Ok(file) => {
                *self.file.lock() = file;
                tracing::info!(path = %self.path.display(), "log file reopened");
            }
            Err(e) => warn!(path = %self.path.display(), "log reopen failed: {e}"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writer handed to the fmt layer; shares the file with the [`LogHandle`].
#[derive(Debug, Clone)]
struct LogWriter {
    file: Arc<Mutex<File>>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.lock().flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> LogWriter {
        self.clone()
    }
}

/// Resolve the log file path.
///
/// An explicit `--logfile` wins. Otherwise the default locations are
/// tried in order; when none is writable, the failure names the first.
pub fn resolve_path(config: &Config) -> Result<PathBuf, LoggingError> {
    if let Some(path) = &config.logfile {
        return Ok(path.clone());
    }

    let mut first_error = None;
    for candidate in DEFAULT_LOG_PATHS {
        let path = PathBuf::from(candidate);
        match open_append(&path) {
            Ok(_) => return Ok(path),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(LoggingError::Unwritable(path, e));
                }
            }
        }
    }
    // DEFAULT_LOG_PATHS is non-empty, so an error was recorded.
    Err(first_error.unwrap_or(LoggingError::AlreadyInitialized))
}

/// Open the log file and install the global subscriber.
///
/// The level maps to the default env-filter directive; an explicit
/// `RUST_LOG` wins.
pub fn init(path: &Path, level: LogLevel) -> Result<LogHandle, LoggingError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = open_append(path).map_err(|e| LoggingError::Unwritable(path.to_path_buf(), e))?;
    let file = Arc::new(Mutex::new(file));
    let writer = LogWriter {
        file: Arc::clone(&file),
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(LogHandle {
        path: path.to_path_buf(),
        file,
    })
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
