//! Persistent per-kind counter table
//!
//! One table maps `"namespace:key"` storage keys to monotonically increasing
//! counts and is checkpointed to a single JSON snapshot file. The in-memory
//! table is the source of truth between snapshots; the file is only the
//! durability checkpoint.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct CounterTable {
    path: PathBuf,
    counts: HashMap<String, u64>,
}

impl CounterTable {
    /// Load the table from its snapshot file.
    ///
    /// A missing file is the normal first-run case. A malformed file is
    /// logged and treated as empty; startup never fails on a bad snapshot.
    pub fn load(path: PathBuf) -> Self {
        let counts = match read_snapshot(&path) {
            Ok(counts) => counts,
            Err(SnapshotError::Io(e)) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Failed to load counter snapshot {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self { path, counts }
    }

    /// Current count for a storage key, 0 if never incremented
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Increment a storage key by one and return the new value
    pub fn increment(&mut self, key: &str) -> u64 {
        let count = self.counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Write the full table durably.
    ///
    /// Writes to a temporary sibling first and renames it into place, so an
    /// interrupted save never corrupts the previous snapshot.
    pub fn save(&self) -> Result<(), SnapshotError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.counts)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

fn read_snapshot(path: &Path) -> Result<HashMap<String, u64>, SnapshotError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}
