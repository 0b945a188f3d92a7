//! Counter-and-event store
//!
//! Tracks per-(namespace, key) visit and like counts with per-IP cooldown
//! rate limiting, write-through JSON snapshots, and append-only per-key
//! activity logs. Single process, single logical writer; the
//! suppress/increment/record sequence for each action kind runs under one
//! coarse lock so concurrent requests cannot defeat the cooldown.
//!
//! On-disk layout, stable across restarts:
//!
//! ```text
//! <data_dir>/counters.json            visit counter snapshot
//! <data_dir>/likes.json               like counter snapshot
//! <data_dir>/visits/<ns>/<key>.jsonl  per-key visit log
//! <data_dir>/likes/<ns>/<key>.jsonl   per-key like log
//! ```

mod cooldown;
mod counters;
mod event_log;
mod models;

pub use cooldown::{rate_limit_key, CooldownTracker, DEFAULT_COOLDOWN_MS};
pub use counters::{CounterTable, SnapshotError};
pub use event_log::EventLog;
pub use models::{ActionKind, LogEntry, LogSummary};

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info};

use crate::geo::{self, GeoResolver};

/// How many recent log entries accompany a badge response
pub const RECENT_LIMIT: usize = 10;

/// Response for a visit action: the live count plus recent activity,
/// returned whether or not the action was counted.
#[derive(Debug, Clone, Serialize)]
pub struct VisitStats {
    pub count: u64,
    pub recent_visits: Vec<LogSummary>,
}

pub struct Store {
    visits: Mutex<CounterTable>,
    likes: Mutex<CounterTable>,
    visit_cooldown: CooldownTracker,
    like_cooldown: CooldownTracker,
    log: EventLog,
    geo: Arc<dyn GeoResolver>,
    shutdown_tx: watch::Sender<bool>,
}

impl Store {
    /// Open the store rooted at `data_dir`, loading both counter snapshots.
    ///
    /// Missing or malformed snapshots load as empty tables; only an unusable
    /// data directory fails construction.
    pub fn open(
        data_dir: &Path,
        geo: Arc<dyn GeoResolver>,
        cooldown_window: Duration,
    ) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let window_ms = cooldown_window.as_millis() as i64;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            visits: Mutex::new(CounterTable::load(data_dir.join("counters.json"))),
            likes: Mutex::new(CounterTable::load(data_dir.join("likes.json"))),
            visit_cooldown: CooldownTracker::new(window_ms),
            like_cooldown: CooldownTracker::new(window_ms),
            log: EventLog::new(data_dir.to_path_buf()),
            geo,
            shutdown_tx,
        })
    }

    /// Count a visit unless the client is in cooldown. Always returns the
    /// live count and recent activity, so a suppressed refresh still renders
    /// a badge.
    pub async fn increment_visit(
        &self,
        namespace: &str,
        key: &str,
        user_agent: Option<&str>,
        referer: Option<&str>,
        ip: Option<&str>,
    ) -> VisitStats {
        let count = self
            .process_action(ActionKind::Visit, namespace, key, user_agent, referer, ip)
            .await;
        VisitStats {
            count,
            recent_visits: self.log.read_recent(ActionKind::Visit, namespace, key, RECENT_LIMIT),
        }
    }

    /// Count a like unless the client is in cooldown; returns the live count
    pub async fn increment_like(
        &self,
        namespace: &str,
        key: &str,
        user_agent: Option<&str>,
        referer: Option<&str>,
        ip: Option<&str>,
    ) -> u64 {
        self.process_action(ActionKind::Like, namespace, key, user_agent, referer, ip)
            .await
    }

    pub async fn get_visit_count(&self, namespace: &str, key: &str) -> u64 {
        self.visits.lock().await.get(&storage_key(namespace, key))
    }

    pub async fn get_like_count(&self, namespace: &str, key: &str) -> u64 {
        self.likes.lock().await.get(&storage_key(namespace, key))
    }

    pub fn get_recent_visits(&self, namespace: &str, key: &str, limit: usize) -> Vec<LogSummary> {
        self.log.read_recent(ActionKind::Visit, namespace, key, limit)
    }

    pub fn get_recent_likes(&self, namespace: &str, key: &str, limit: usize) -> Vec<LogSummary> {
        self.log.read_recent(ActionKind::Like, namespace, key, limit)
    }

    /// The accept/suppress core. Holds the per-kind lock across the whole
    /// check-increment-persist-record sequence so two concurrent requests
    /// cannot both pass the cooldown check.
    ///
    /// Persistence failures are logged and swallowed: the in-memory count
    /// stays authoritative and the caller still gets a usable response.
    async fn process_action(
        &self,
        kind: ActionKind,
        namespace: &str,
        key: &str,
        user_agent: Option<&str>,
        referer: Option<&str>,
        ip: Option<&str>,
    ) -> u64 {
        let storage_key = storage_key(namespace, key);
        let rate_key = rate_limit_key(namespace, key, ip);

        let (table, cooldown) = match kind {
            ActionKind::Visit => (&self.visits, &self.visit_cooldown),
            ActionKind::Like => (&self.likes, &self.like_cooldown),
        };

        let mut table = table.lock().await;
        let now = Utc::now();

        if cooldown.is_suppressed(&rate_key, now.timestamp_millis()) {
            debug!("Suppressed {} for {} (cooldown)", kind, rate_key);
            return table.get(&storage_key);
        }

        let count = table.increment(&storage_key);

        let (clean_ip, location) = match ip {
            Some(ip) => {
                let (clean, location) = geo::locate(self.geo.as_ref(), ip);
                (Some(clean), location)
            }
            None => (None, Default::default()),
        };

        let entry = LogEntry {
            timestamp: now,
            namespace: namespace.to_string(),
            key: key.to_string(),
            count,
            kind,
            user_agent: user_agent.map(str::to_string),
            referer: referer.map(str::to_string),
            ip: clean_ip,
            country: location.country,
            region: location.region,
            city: location.city,
            timezone: location.timezone,
        };
        if let Err(e) = self.log.append(&entry) {
            error!("Failed to append {} log entry: {}", kind, e);
        }
        if let Err(e) = table.save() {
            error!("Failed to save {} snapshot: {}", kind, e);
        }

        cooldown.record_accepted(&rate_key, now.timestamp_millis());
        count
    }

    /// Spawn the periodic cooldown sweep. Memory reclamation only; cooldown
    /// correctness never depends on this running.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            // Skip the first tick which fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now_ms = Utc::now().timestamp_millis();
                        let removed = store.visit_cooldown.sweep_expired(now_ms)
                            + store.like_cooldown.sweep_expired(now_ms);
                        if removed > 0 {
                            debug!("Swept {} expired cooldown entries", removed);
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("Cooldown sweeper shutting down");
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Signal the sweeper to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Synchronously flush both counter snapshots, logging any failure
    pub async fn flush(&self) {
        if let Err(e) = self.visits.lock().await.save() {
            error!("Failed to save visit snapshot on flush: {}", e);
        }
        if let Err(e) = self.likes.lock().await.save() {
            error!("Failed to save like snapshot on flush: {}", e);
        }
    }
}

fn storage_key(namespace: &str, key: &str) -> String {
    format!("{}:{}", namespace, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::NoopResolver;
    use tempfile::tempdir;

    fn test_store(dir: &Path, cooldown: Duration) -> Arc<Store> {
        Arc::new(Store::open(dir, Arc::new(NoopResolver), cooldown).unwrap())
    }

    #[tokio::test]
    async fn test_unknown_keys_read_zero() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path(), Duration::from_millis(DEFAULT_COOLDOWN_MS as u64));

        assert_eq!(store.get_visit_count("proj", "readme").await, 0);
        assert_eq!(store.get_like_count("proj", "readme").await, 0);
        assert!(store.get_recent_visits("proj", "readme", 10).is_empty());
    }

    #[tokio::test]
    async fn test_same_ip_suppressed_within_window() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path(), Duration::from_secs(30));

        let first = store
            .increment_visit("proj", "readme", None, None, Some("10.0.0.1"))
            .await;
        assert_eq!(first.count, 1);
        assert_eq!(first.recent_visits.len(), 1);

        // Immediate refresh from the same IP: not counted, but still answered
        let second = store
            .increment_visit("proj", "readme", None, None, Some("10.0.0.1"))
            .await;
        assert_eq!(second.count, 1);
        assert_eq!(second.recent_visits.len(), 1);
    }

    #[tokio::test]
    async fn test_different_ips_both_count() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path(), Duration::from_secs(30));

        store
            .increment_visit("proj", "readme", None, None, Some("10.0.0.1"))
            .await;
        let stats = store
            .increment_visit("proj", "readme", None, None, Some("10.0.0.2"))
            .await;
        assert_eq!(stats.count, 2);
    }

    #[tokio::test]
    async fn test_visit_and_like_cooldowns_are_separate() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path(), Duration::from_secs(30));

        store
            .increment_visit("proj", "readme", None, None, Some("10.0.0.1"))
            .await;
        // A visit in cooldown must not suppress the first like from that IP
        let likes = store
            .increment_like("proj", "readme", None, None, Some("10.0.0.1"))
            .await;
        assert_eq!(likes, 1);
    }

    #[tokio::test]
    async fn test_counts_again_after_window_elapses() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path(), Duration::from_millis(40));

        store
            .increment_visit("proj", "readme", None, None, Some("10.0.0.1"))
            .await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        let stats = store
            .increment_visit("proj", "readme", None, None, Some("10.0.0.1"))
            .await;
        assert_eq!(stats.count, 2);
    }

    #[tokio::test]
    async fn test_missing_ip_shares_unknown_bucket() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path(), Duration::from_secs(30));

        let first = store.increment_visit("proj", "readme", None, None, None).await;
        let second = store.increment_visit("proj", "readme", None, None, None).await;
        assert_eq!(first.count, 1);
        assert_eq!(second.count, 1);
    }
}
