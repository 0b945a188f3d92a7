//! Append-only per-key activity logs
//!
//! Each `(kind, namespace, key)` gets its own newline-delimited JSON file
//! under `<data_dir>/<visits|likes>/<namespace>/<key>.jsonl`. Per-key files
//! keep `read_recent` proportional to one key's history and isolate a
//! corrupted file from every other key.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::store::models::{ActionKind, LogEntry, LogSummary};

pub struct EventLog {
    root: PathBuf,
}

impl EventLog {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Durably append one entry to its per-key log file, creating the
    /// directory hierarchy on first use. The record goes out in a single
    /// write call, so a crash loses at most the in-flight entry.
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let path = self.log_path(entry.kind, &entry.namespace, &entry.key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }

        let mut line = serde_json::to_string(entry).context("Failed to serialize log entry")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to append to log file {}", path.display()))?;

        Ok(())
    }

    /// Last `limit` entries for a key, most-recent-first.
    ///
    /// A missing file is an empty history, never an error. Each line is
    /// parsed independently so one malformed line only loses itself.
    pub fn read_recent(
        &self,
        kind: ActionKind,
        namespace: &str,
        key: &str,
        limit: usize,
    ) -> Vec<LogSummary> {
        let Ok(path) = self.log_path(kind, namespace, key) else {
            return Vec::new();
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read log file {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        let entries: Vec<LogEntry> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping malformed line in {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        // Append order is chronological (single writer), so reading the
        // tail in reverse yields most-recent-first directly.
        entries
            .into_iter()
            .rev()
            .take(limit)
            .map(LogSummary::from)
            .collect()
    }

    fn log_path(&self, kind: ActionKind, namespace: &str, key: &str) -> Result<PathBuf> {
        if !valid_component(namespace) || !valid_component(key) {
            bail!("invalid log path component: {}/{}", namespace, key);
        }
        Ok(self
            .root
            .join(kind.log_dir())
            .join(namespace)
            .join(format!("{}.jsonl", key)))
    }
}

/// Namespace and key become path components; anything that could escape the
/// log root is rejected outright.
fn valid_component(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\'])
}
