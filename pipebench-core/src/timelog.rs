//! Per-Stage Timestamp Logs
//!
//! Each stage writes one plain-text log, one event per line:
//! `"<event_id> <timestamp>"`. The event id is an opaque token; the
//! timestamp parses as floating-point seconds. Extra fields on a line are
//! ignored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a per-stage timestamp log
#[derive(Debug, Error)]
pub enum TimeLogError {
    /// The log file could not be opened or read
    #[error("failed to read timestamp log {path}: {source}")]
    Read {
        /// Log file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// A line did not match the `"<event_id> <timestamp>"` contract
    #[error("{path}:{line}: malformed timestamp record: {reason}")]
    Malformed {
        /// Log file path
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong with the record
        reason: String,
    },
}

/// One stage's event-id → timestamp mapping, preserving on-disk order.
///
/// A duplicate id overwrites the stored timestamp but keeps the first-seen
/// position, so traversal order stays the order in which ids were first
/// encountered in the log.
#[derive(Debug, Clone, Default)]
pub struct TimeLog {
    order: Vec<String>,
    times: HashMap<String, f64>,
}

impl TimeLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event_id` at `timestamp` seconds (last write wins).
    pub fn insert(&mut self, event_id: impl Into<String>, timestamp: f64) {
        let event_id = event_id.into();
        if self.times.insert(event_id.clone(), timestamp).is_none() {
            self.order.push(event_id);
        }
    }

    /// Timestamp recorded for `event_id`, if any.
    pub fn get(&self, event_id: &str) -> Option<f64> {
        self.times.get(event_id).copied()
    }

    /// Event ids in first-encountered order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(event_id, timestamp)` pairs in first-encountered order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        // Every id in `order` has an entry in `times`; insert() is the only
        // writer and maintains both sides.
        self.order
            .iter()
            .map(|id| (id.as_str(), self.times[id.as_str()]))
    }

    /// Number of distinct event ids.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the log holds no events.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Load a log file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TimeLogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| TimeLogError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(BufReader::new(file), path)
    }

    fn parse<R: BufRead>(reader: R, path: &Path) -> Result<Self, TimeLogError> {
        let mut log = TimeLog::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| TimeLogError::Read {
                path: path.to_path_buf(),
                source: e,
            })?;

            let mut fields = line.split_whitespace();
            let (Some(event_id), Some(raw_timestamp)) = (fields.next(), fields.next()) else {
                return Err(TimeLogError::Malformed {
                    path: path.to_path_buf(),
                    line: index + 1,
                    reason: "expected \"<event_id> <timestamp>\"".to_string(),
                });
            };

            let timestamp: f64 = raw_timestamp.parse().map_err(|_| TimeLogError::Malformed {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("invalid timestamp {raw_timestamp:?}"),
            })?;

            log.insert(event_id, timestamp);
        }
        Ok(log)
    }
}
