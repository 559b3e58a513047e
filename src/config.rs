//! Application configuration.
//!
//! Loaded from a TOML file (default `~/.config/charge-scout/config.toml`,
//! overridable via `CHARGE_SCOUT_CONFIG`); every section falls back to
//! sensible defaults so a missing file still yields a runnable server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub open_charge_map: OpenChargeMapConfig,
    pub search: SearchConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Base URL of the first-party catalog API.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenChargeMapConfig {
    pub base_url: String,
    /// Optional API key; basic access works without one.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl OpenChargeMapConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OpenChargeMapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openchargemap.io/v3".to_string(),
            api_key: None,
            timeout_secs: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Fallback reference point when the caller has no location
    /// (Pune city centre).
    pub default_lat: f64,
    pub default_lng: f64,
    pub default_radius_km: f64,
    pub default_max_results: usize,
    /// Outer per-source bound applied by the aggregator, on top of each
    /// adapter's own transport timeout.
    pub source_timeout_secs: u64,
}

impl SearchConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_lat: 18.5204,
            default_lng: 73.8567,
            default_radius_km: 25.0,
            default_max_results: 20,
            source_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub history_cap: usize,
    /// Inbox persistence path; defaults next to the config file.
    pub store_path: Option<PathBuf>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            history_cap: 50,
            store_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Default config location: `<config dir>/charge-scout/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("charge-scout")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.search.default_lat, 18.5204);
        assert_eq!(cfg.notifications.history_cap, 50);
        assert!(cfg.open_charge_map.api_key.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [open_charge_map]
            api_key = "test-key"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.open_charge_map.api_key.as_deref(), Some("test-key"));
        assert_eq!(cfg.catalog.timeout_secs, 5);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(AppConfig::load(Path::new("/definitely/not/here.toml")).is_err());
    }
}
