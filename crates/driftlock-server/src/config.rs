//! Server configuration: typed settings with layered loading
//! (defaults → TOML file → `DRIFTLOCK__`-prefixed environment).

use std::net::SocketAddr;
use std::time::Duration;

use driftlock_controller::ControllerSettings;
use driftlock_core::RetryPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.controller.poll_interval_secs == 0 {
            return Err("controller.poll_interval_secs must be > 0".into());
        }
        if self.controller.history_retention == 0 {
            return Err("controller.history_retention must be > 0".into());
        }
        if self.controller.worker_limit == 0 {
            return Err("controller.worker_limit must be > 0".into());
        }
        if self.source.root.is_empty() {
            return Err("source.root must not be empty".into());
        }
        if self.store.data_dir.is_empty() {
            return Err("store.data_dir must not be empty".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Controller tunables derived from this configuration.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            poll_interval: Duration::from_secs(self.controller.poll_interval_secs),
            history_retention: self.controller.history_retention,
            worker_limit: self.controller.worker_limit,
            call_timeout: Duration::from_secs(self.controller.call_timeout_secs),
            retry: RetryPolicy {
                max_retries: self.controller.retry.max_retries,
                base_delay: Duration::from_millis(self.controller.retry.base_delay_ms),
                max_delay: Duration::from_millis(self.controller.retry.max_delay_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Seconds between unprompted reconciliation ticks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Newest sync records kept per application.
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,
    /// Parallel sync items per application.
    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,
    /// Bound on any single target-system call, in seconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            history_retention: default_history_retention(),
            worker_limit: default_worker_limit(),
            call_timeout_secs: default_call_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root directory holding source repositories.
    #[serde(default = "default_source_root")]
    pub root: String,
    /// External renderer command; pre-rendered manifests are read
    /// directly when absent.
    #[serde(default)]
    pub renderer: Option<RendererConfig>,
    /// Statically resolvable secret references (local development).
    #[serde(default)]
    pub secrets: std::collections::HashMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: default_source_root(),
            renderer: None,
            secrets: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory for durable application definitions and sync history.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_poll_interval() -> u64 {
    30
}
fn default_history_retention() -> usize {
    50
}
fn default_worker_limit() -> usize {
    4
}
fn default_call_timeout() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    200
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_source_root() -> String {
    "./repos".into()
}
fn default_data_dir() -> String {
    "./data".into()
}
fn default_log_level() -> String {
    "info".into()
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("driftlock.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., DRIFTLOCK__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("DRIFTLOCK")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.controller.poll_interval_secs, 30);
    }

    #[test]
    fn test_validation_rejects_zero_poll_interval() {
        let mut cfg = AppConfig::default();
        cfg.controller.poll_interval_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_controller_settings_conversion() {
        let mut cfg = AppConfig::default();
        cfg.controller.poll_interval_secs = 7;
        cfg.controller.retry.base_delay_ms = 250;
        let settings = cfg.controller_settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(7));
        assert_eq!(settings.retry.base_delay, Duration::from_millis(250));
    }
}
