use std::path::PathBuf;
use std::time::Duration;

use heartlog_gateway::GatewayConfig;
use heartlog_logging::LogConfig;

/// heartlog runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// SQLite database path
    pub db_path: String,
    /// Log level
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<PathBuf>,

    // Dashboards and live feed
    pub monitor_hours: usize,
    pub keepalive_secs: u64,
    pub listener_buffer: usize,

    /// Header set by a trusted proxy carrying the caller's login.
    pub identity_header: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let gateway = GatewayConfig::default();
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            db_path: "heartlog.db".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            log_dir: None,
            monitor_hours: gateway.monitor_hours,
            keepalive_secs: gateway.keepalive.as_secs(),
            listener_buffer: gateway.listener_buffer,
            identity_header: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source.
    /// Unparseable values fall back to the default.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_address: var("HEARTLOG_BIND").unwrap_or(defaults.bind_address),
            port: var("HEARTLOG_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            db_path: var("HEARTLOG_DB").unwrap_or(defaults.db_path),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: var("HEARTLOG_LOG_JSON")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.log_json),
            log_dir: non_empty("HEARTLOG_LOG_DIR").map(PathBuf::from),
            monitor_hours: var("HEARTLOG_MONITOR_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.monitor_hours),
            keepalive_secs: var("HEARTLOG_KEEPALIVE_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.keepalive_secs),
            listener_buffer: var("HEARTLOG_LISTENER_BUFFER")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.listener_buffer),
            identity_header: non_empty("HEARTLOG_IDENTITY_HEADER"),
        }
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            monitor_hours: self.monitor_hours,
            keepalive: Duration::from_secs(self.keepalive_secs),
            listener_buffer: self.listener_buffer,
        }
    }

    pub fn logging(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            json: self.log_json,
            dir: self.log_dir.clone(),
        }
    }

    /// Base URL client subcommands talk to by default.
    pub fn local_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}
