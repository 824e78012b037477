//! A capped, optionally persisted diagnostic error log.
//!
//! Diagnostic only, not part of the core contract. Holds at most
//! [`MAX_ERROR_LOG_ENTRIES`] entries, evicting the oldest first, and mirrors
//! itself to a JSON file when a path is configured. Persistence failures are
//! logged and otherwise ignored; diagnostics must never take the session down.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

/// FIFO capacity of the log.
pub const MAX_ERROR_LOG_ENTRIES: usize = 10;

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    pub error: String,
    pub context: String,
}

pub struct ErrorLog {
    path: Option<PathBuf>,
    entries: Mutex<VecDeque<ErrorLogEntry>>,
}

impl ErrorLog {
    /// A log that lives only for the session.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// A log mirrored to `path`. Existing entries at that path are loaded;
    /// unreadable or malformed files are discarded with a warning.
    pub fn at_path(path: PathBuf) -> Self {
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<ErrorLogEntry>>(&bytes) {
                Ok(loaded) => {
                    let mut deque: VecDeque<_> = loaded.into();
                    while deque.len() > MAX_ERROR_LOG_ENTRIES {
                        deque.pop_front();
                    }
                    deque
                }
                Err(e) => {
                    warn!("Discarding malformed error log at {}: {e}", path.display());
                    VecDeque::new()
                }
            },
            Err(_) => VecDeque::new(),
        };
        Self {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// Appends an entry, evicting the oldest when full, and mirrors the log to
    /// disk if configured.
    pub fn record(&self, error: &str, context: &str) {
        let mut entries = self.entries.lock().expect("error log lock poisoned");
        entries.push_back(ErrorLogEntry {
            timestamp: Utc::now(),
            error: error.to_string(),
            context: context.to_string(),
        });
        while entries.len() > MAX_ERROR_LOG_ENTRIES {
            entries.pop_front();
        }
        self.persist(&entries);
    }

    /// Snapshot of the current entries, oldest first.
    pub fn entries(&self) -> Vec<ErrorLogEntry> {
        self.entries
            .lock()
            .expect("error log lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("error log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all entries and removes the persisted file, if any.
    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("error log lock poisoned")
            .clear();
        if let Some(path) = &self.path {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove error log {}: {e}", path.display());
                }
            }
        }
    }

    fn persist(&self, entries: &VecDeque<ErrorLogEntry>) {
        let Some(path) = &self.path else {
            return;
        };
        let snapshot: Vec<_> = entries.iter().cloned().collect();
        match serde_json::to_vec_pretty(&snapshot) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(path, bytes) {
                    warn!("Failed to persist error log to {}: {e}", path.display());
                }
            }
            Err(e) => warn!("Failed to serialize error log: {e}"),
        }
    }
}
