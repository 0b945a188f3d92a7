//! Data models for the counter store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which counter an action targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Visit,
    Like,
}

impl ActionKind {
    /// Directory under the data dir holding this kind's per-key log files
    pub fn log_dir(self) -> &'static str {
        match self {
            ActionKind::Visit => "visits",
            ActionKind::Like => "likes",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Visit => "visit",
            ActionKind::Like => "like",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted action, appended to the per-key log file as a JSON line.
///
/// Field names stay camelCase so that log files written by earlier
/// deployments of the service parse unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub namespace: String,
    pub key: String,
    /// Counter value after this action was applied
    pub count: u64,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Bounded read view over a [`LogEntry`], returned by recent-activity queries.
/// Omits user agent, referer and kind.
#[derive(Debug, Clone, Serialize)]
pub struct LogSummary {
    pub count: u64,
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl From<LogEntry> for LogSummary {
    fn from(entry: LogEntry) -> Self {
        Self {
            count: entry.count,
            time: entry.timestamp,
            country: entry.country,
            city: entry.city,
            ip: entry.ip,
        }
    }
}
