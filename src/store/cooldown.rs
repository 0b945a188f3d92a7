//! Per-IP anti-abuse cooldown
//!
//! Maps a rate-limit key (`namespace:key:ip`) to the timestamp of the last
//! accepted action. Suppression is always re-derived from the stored
//! timestamp, so the periodic sweep is purely memory reclamation and never a
//! correctness dependency: an expired entry that has not been swept behaves
//! exactly like an absent one.

use dashmap::DashMap;

/// Default cooldown window between accepted actions from one IP
pub const DEFAULT_COOLDOWN_MS: i64 = 30_000;

pub struct CooldownTracker {
    window_ms: i64,
    last_accepted: DashMap<String, i64>,
}

impl CooldownTracker {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            last_accepted: DashMap::new(),
        }
    }

    /// True iff an accepted action for this key happened within the window
    pub fn is_suppressed(&self, key: &str, now_ms: i64) -> bool {
        match self.last_accepted.get(key) {
            Some(entry) => now_ms - *entry.value() < self.window_ms,
            None => false,
        }
    }

    /// Record an accepted action.
    ///
    /// Must only be called for actions that were actually counted; suppressed
    /// attempts do not reset or extend the window.
    pub fn record_accepted(&self, key: &str, now_ms: i64) {
        self.last_accepted.insert(key.to_string(), now_ms);
    }

    /// Drop entries older than the window. Returns how many were removed.
    pub fn sweep_expired(&self, now_ms: i64) -> usize {
        let before = self.last_accepted.len();
        let window_ms = self.window_ms;
        self.last_accepted
            .retain(|_, last| now_ms - *last < window_ms);
        before.saturating_sub(self.last_accepted.len())
    }

    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }
}

/// Rate-limit key for one (namespace, key, client) triple. Requests without
/// a resolvable IP all share the single "unknown" bucket.
pub fn rate_limit_key(namespace: &str, key: &str, ip: Option<&str>) -> String {
    format!("{}:{}:{}", namespace, key, ip.unwrap_or("unknown"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key_not_suppressed() {
        let tracker = CooldownTracker::new(DEFAULT_COOLDOWN_MS);
        assert!(!tracker.is_suppressed("proj:readme:1.2.3.4", 1_000_000));
    }

    #[test]
    fn test_suppressed_within_window() {
        let tracker = CooldownTracker::new(30_000);
        tracker.record_accepted("proj:readme:1.2.3.4", 1_000_000);

        assert!(tracker.is_suppressed("proj:readme:1.2.3.4", 1_000_001));
        assert!(tracker.is_suppressed("proj:readme:1.2.3.4", 1_029_999));
        // Window boundary: exactly window_ms later is no longer suppressed
        assert!(!tracker.is_suppressed("proj:readme:1.2.3.4", 1_030_000));
    }

    #[test]
    fn test_keys_are_independent() {
        let tracker = CooldownTracker::new(30_000);
        tracker.record_accepted("proj:readme:1.2.3.4", 1_000_000);

        assert!(!tracker.is_suppressed("proj:readme:5.6.7.8", 1_000_001));
        assert!(!tracker.is_suppressed("proj:other:1.2.3.4", 1_000_001));
    }

    #[test]
    fn test_expired_entry_without_sweep() {
        // Correctness must not depend on the sweep having run
        let tracker = CooldownTracker::new(30_000);
        tracker.record_accepted("proj:readme:1.2.3.4", 1_000_000);

        assert!(!tracker.is_suppressed("proj:readme:1.2.3.4", 1_100_000));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let tracker = CooldownTracker::new(30_000);
        tracker.record_accepted("old", 1_000_000);
        tracker.record_accepted("fresh", 1_025_000);

        let removed = tracker.sweep_expired(1_040_000);
        assert_eq!(removed, 1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_suppressed("fresh", 1_040_000));
    }

    #[test]
    fn test_rate_limit_key_format() {
        assert_eq!(
            rate_limit_key("proj", "readme", Some("1.2.3.4")),
            "proj:readme:1.2.3.4"
        );
        assert_eq!(rate_limit_key("proj", "readme", None), "proj:readme:unknown");
    }
}
