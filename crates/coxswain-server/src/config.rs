use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub operations: OperationsConfig,
    #[serde(default)]
    pub provisioner: ProvisionerConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.reconcile.idle_timeout_secs == 0 {
            return Err("reconcile.idle_timeout_secs must be > 0".into());
        }
        if self.reconcile.event_buffer == 0 {
            return Err("reconcile.event_buffer must be > 0".into());
        }
        if self.operations.retention_hours == 0 {
            return Err("operations.retention_hours must be > 0".into());
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
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    2 * 1024 * 1024
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

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// A process instance with no events for this long terminates; the next
    /// event starts a fresh one.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Pause before redelivering a notification that failed retryably.
    #[serde(default = "default_redeliver_delay_ms")]
    pub redeliver_delay_ms: u64,
    /// Event queue depth per process instance.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            redeliver_delay_ms: default_redeliver_delay_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl ReconcileConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
    pub fn redeliver_delay(&self) -> Duration {
        Duration::from_millis(self.redeliver_delay_ms)
    }
}

fn default_idle_timeout_secs() -> u64 {
    3600
}
fn default_redeliver_delay_ms() -> u64 {
    250
}
fn default_event_buffer() -> usize {
    32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationsConfig {
    /// How long finished operation records stay pollable.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
        }
    }
}

impl OperationsConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 60 * 60)
    }
}

fn default_retention_hours() -> u64 {
    48
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    /// Simulated provisioning latency of the built-in work handler.
    #[serde(default = "default_provision_delay_ms")]
    pub delay_ms: u64,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_provision_delay_ms(),
        }
    }
}

impl ProvisionerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_provision_delay_ms() -> u64 {
    50
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
                let default_path = PathBuf::from("coxswain.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment overrides, e.g. COXSWAIN__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("COXSWAIN")
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
