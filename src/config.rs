use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tracing::trace;

/// Management API of the message broker
#[derive(Debug, Clone, serde::Deserialize)]
pub struct BrokerConfig {
    /// Full URL of the overview endpoint
    #[serde(default = "default_broker_url")]
    pub url: String,

    #[serde(default = "default_broker_user")]
    pub username: String,

    #[serde(default = "default_broker_user")]
    pub password: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_broker_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: default_broker_url(),
            username: default_broker_user(),
            password: default_broker_user(),
            timeout_ms: default_broker_timeout_ms(),
        }
    }
}

impl BrokerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_broker_url() -> String {
    String::from("http://localhost:15672/api/overview")
}

fn default_broker_user() -> String {
    String::from("guest")
}

fn default_broker_timeout_ms() -> u64 {
    2000
}

/// Cadence of the monitor loop
#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitorConfig {
    /// Seconds between two ticks
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Group status, container list and connector list run every N ticks
    #[serde(default = "default_status_every")]
    pub status_every: u64,

    /// A history point is recorded every N ticks
    #[serde(default = "default_history_every")]
    pub history_every: u64,

    /// Window used for CPU and network rate measurement
    #[serde(default = "default_sample_window_ms")]
    pub sample_window_ms: u64,

    /// Upper bound for a single compose status probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            status_every: default_status_every(),
            history_every: default_history_every(),
            sample_window_ms: default_sample_window_ms(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl MonitorConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs.max(1))
    }

    pub fn sample_window(&self) -> Duration {
        Duration::from_millis(self.sample_window_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn default_tick_secs() -> u64 {
    2
}

fn default_status_every() -> u64 {
    2
}

fn default_history_every() -> u64 {
    150
}

fn default_sample_window_ms() -> u64 {
    100
}

fn default_probe_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Directory holding the core compose descriptor
    #[serde(default = "default_core_dir")]
    pub core_dir: PathBuf,

    /// Directory whose subdirectories are connector groups
    #[serde(default = "default_connectors_dir")]
    pub connectors_dir: PathBuf,

    /// Container CLI; `compose` subcommands are run through it
    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,

    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,

    #[serde(default = "default_max_history_points")]
    pub max_history_points: usize,

    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Optional directory with the web frontend
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core_dir: default_core_dir(),
            connectors_dir: default_connectors_dir(),
            docker_binary: default_docker_binary(),
            history_file: default_history_file(),
            max_history_points: default_max_history_points(),
            broker: BrokerConfig::default(),
            monitor: MonitorConfig::default(),
            static_dir: None,
        }
    }
}

fn deployment_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("opencti")
}

fn default_core_dir() -> PathBuf {
    deployment_root().join("docker")
}

fn default_connectors_dir() -> PathBuf {
    deployment_root().join("connectors")
}

fn default_docker_binary() -> String {
    String::from("docker")
}

fn default_history_file() -> PathBuf {
    PathBuf::from("./stats_history.json")
}

fn default_max_history_points() -> usize {
    288
}

pub fn read_config_file(path: &Path) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file: {}", path.display()))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

/// Load the config file if one was given, otherwise fall back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => read_config_file(path),
        None => Ok(Config::default()),
    }
}
