//! Daemon configuration.

use crate::error::{AppError, AppResult};
use marketd_exchange::AdapterConfig;
use marketd_store::StoreConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration, one struct per TOML section.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub daemon: DaemonSection,
    pub database: StoreConfig,
    #[serde(default)]
    pub websocket: WebSocketSection,
    #[serde(default)]
    pub orderbook: OrderBookSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonSection {
    /// Path of the persisted `{ "active": bool }` state file.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

fn default_state_file() -> String {
    "data/marketd.state".to_string()
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketSection {
    /// Keep-alive interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Fixed reconnect backoff in seconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,
}

fn default_ping_interval() -> u64 {
    25
}

fn default_reconnect_delay() -> u64 {
    3
}

impl Default for WebSocketSection {
    fn default() -> Self {
        Self {
            ping_interval: default_ping_interval(),
            reconnect_delay: default_reconnect_delay(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderBookSection {
    /// Log raw frames to and from the venue.
    #[serde(default)]
    pub debug_log_raw: bool,
    /// Log decoded unified messages.
    #[serde(default)]
    pub debug_log_msg: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load from a specific TOML file.
    pub fn from_file(path: &str) -> AppResult<AppConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read {path}: {e}")))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse {path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config path: CLI flag, then `MARKETD_CONFIG`, then the
    /// default location.
    pub fn resolve_path(cli: Option<String>) -> String {
        cli.or_else(|| std::env::var("MARKETD_CONFIG").ok())
            .unwrap_or_else(|| "config/default.toml".to_string())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.database.db_type.is_empty() {
            return Err(AppError::Config("database.type is required".into()));
        }
        if self.database.host.is_empty() {
            return Err(AppError::Config("database.host is required".into()));
        }
        if self.database.database.is_empty() {
            return Err(AppError::Config("database.database is required".into()));
        }
        if Path::new(&self.daemon.state_file)
            .file_name()
            .is_none()
        {
            return Err(AppError::Config("daemon.state_file is required".into()));
        }
        Ok(())
    }

    /// Adapter tunables derived from the websocket and orderbook sections.
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            ping_interval: Duration::from_secs(self.websocket.ping_interval.max(1)),
            reconnect_delay: Duration::from_secs(self.websocket.reconnect_delay.max(1)),
            debug_log_raw: self.orderbook.debug_log_raw,
            debug_log_msg: self.orderbook.debug_log_msg,
        }
    }

    /// Copy with the database password masked, for logging.
    pub fn masked(&self) -> AppConfig {
        let mut copy = self.clone();
        if !copy.database.password.is_empty() {
            copy.database.password = "*****".to_string();
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [daemon]
        state_file = "data/marketd.state"

        [database]
        type = "postgres"
        host = "localhost"
        port = 5432
        user = "marketd"
        password = "secret"
        database = "markets"

        [websocket]
        ping_interval = 25
        reconnect_delay = 3

        [orderbook]
        debug_log_raw = true
    "#;

    #[test]
    fn test_parse_sample() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.database.db_type, "postgres");
        assert_eq!(config.websocket.ping_interval, 25);
        assert!(config.orderbook.debug_log_raw);
        assert!(!config.orderbook.debug_log_msg);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            type = "mysql"
            host = "db"
            port = 3306
            user = "u"
            password = "p"
            database = "d"
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.daemon.state_file, "data/marketd.state");
        assert_eq!(config.websocket.reconnect_delay, 3);
    }

    #[test]
    fn test_validation_rejects_empty_database() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            type = ""
            host = "db"
            port = 3306
            user = "u"
            password = "p"
            database = "d"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_masked_hides_password() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.masked().database.password, "*****");
        assert_eq!(config.database.password, "secret");
    }

    #[test]
    fn test_adapter_config_mapping() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();
        let adapter = config.adapter_config();
        assert_eq!(adapter.ping_interval, Duration::from_secs(25));
        assert_eq!(adapter.reconnect_delay, Duration::from_secs(3));
        assert!(adapter.debug_log_raw);
    }
}
