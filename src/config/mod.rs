use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::store::DEFAULT_COOLDOWN_MS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    /// Path to a MaxMind City .mmdb file; geolocation is skipped when unset
    #[serde(default)]
    pub geoip_db_path: Option<String>,
    #[serde(default = "StoreConfig::default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "StoreConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl StoreConfig {
    const fn default_cooldown_ms() -> u64 {
        DEFAULT_COOLDOWN_MS as u64
    }

    const fn default_sweep_interval_secs() -> u64 {
        300
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        let geoip_db_path = std::env::var("GEOIP_DB_PATH").ok();

        let cooldown_ms = std::env::var("COOLDOWN_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(StoreConfig::default_cooldown_ms);

        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(StoreConfig::default_sweep_interval_secs);

        Ok(Config {
            server: ServerConfig { host, port },
            store: StoreConfig {
                data_dir: PathBuf::from(data_dir),
                geoip_db_path,
                cooldown_ms,
                sweep_interval_secs,
            },
        })
    }
}
