//! JSON-file history store
//!
//! Every append is a read-modify-write of the whole file. At one append every
//! few minutes that is cheap, and it keeps the file a plain JSON array that the
//! frontend can consume unchanged.
//!
//! Reads never fail outward: a missing file is an empty history, and a corrupt
//! file is logged and treated as empty.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, trace, warn};

use super::error::StorageResult;
use crate::{HistoryLog, HistoryPoint};

/// Handle to the persisted history file
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    max_points: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, max_points: usize) -> Self {
        Self {
            path: path.into(),
            max_points,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    /// Load the full history, oldest first.
    pub fn load(&self) -> HistoryLog {
        match self.try_load() {
            Ok(history) => history,
            Err(e) => {
                warn!(
                    "history file {} unreadable, starting empty: {e}",
                    self.path.display()
                );
                HistoryLog::new()
            }
        }
    }

    fn try_load(&self) -> StorageResult<HistoryLog> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no history file at {}", self.path.display());
                return Ok(HistoryLog::new());
            }
            Err(e) => return Err(e.into()),
        };

        let history: HistoryLog = serde_json::from_str(&content)?;
        trace!("loaded {} history points", history.len());
        Ok(history)
    }

    /// Replace the file contents with `history`.
    ///
    /// The data is written to a temporary file next to the target and then
    /// renamed over it, so a failed write never leaves a truncated file behind.
    pub fn save(&self, history: &[HistoryPoint]) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut file, history)?;
        file.flush()?;
        file.persist(&self.path)?;

        Ok(())
    }

    /// Append one point, evicting the oldest entries beyond the bound.
    ///
    /// Failures are logged and swallowed.
    pub fn append(&self, point: HistoryPoint) {
        match self.try_append(point) {
            Ok(len) => debug!("history now holds {len} points"),
            Err(e) => error!(
                "failed to append to history file {}: {e}",
                self.path.display()
            ),
        }
    }

    fn try_append(&self, point: HistoryPoint) -> StorageResult<usize> {
        let mut history = self.load();
        history.push(point);

        if history.len() > self.max_points {
            let excess = history.len() - self.max_points;
            history.drain(..excess);
        }

        self.save(&history)?;
        Ok(history.len())
    }

    /// Everything currently persisted.
    pub fn query_all(&self) -> HistoryLog {
        self.load()
    }
}
