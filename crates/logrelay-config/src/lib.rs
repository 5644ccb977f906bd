//! Service configuration for logrelay
//!
//! Loaded from `config.toml` in the platform config directory (created with
//! defaults on first run), then overridden by `LOGRELAY_*` environment
//! variables.

pub mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use error::{ConfigError, Result};

pub const ENV_NATS_URL: &str = "LOGRELAY_NATS_URL";
pub const ENV_LOG_FILE: &str = "LOGRELAY_LOG_FILE";
pub const ENV_STATE_DIR: &str = "LOGRELAY_STATE_DIR";
pub const ENV_JWT_SECRET: &str = "LOGRELAY_JWT_SECRET";
pub const ENV_SERVER_PORT: &str = "LOGRELAY_SERVER_PORT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// File the default basic adapter writes to
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Directory holding the persisted adapter state
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// HS256 secret for viewer tokens
    #[serde(default)]
    pub jwt_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_find_subject")]
    pub find_subject: String,

    #[serde(default = "default_update_subject")]
    pub update_subject: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            log_file: default_log_file(),
            state_dir: default_state_dir(),
            server: ServerConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            jwt_secret: String::new(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            find_subject: default_find_subject(),
            update_subject: default_update_subject(),
            timeout_ms: default_timeout_ms(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("io", "logrelay", "logrelay")
}

fn default_nats_url() -> String {
    "nats://127.0.0.1:4222".to_string()
}

fn default_log_file() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().join("logrelay.log"),
        None => PathBuf::from("logrelay.log"),
    }
}

fn default_state_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from(".logrelay"),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    22001
}

fn default_find_subject() -> String {
    "datacenter.find".to_string()
}

fn default_update_subject() -> String {
    "datacenter.set".to_string()
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_retry_interval() -> u64 {
    3
}

impl Config {
    /// Load `path`, creating it with defaults if missing, then apply
    /// environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_or_create(path)?;
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    fn read_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            return toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            });
        }

        let config = Config::default();
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, toml::to_string_pretty(&config)?).map_err(io_err)?;
        info!(path = %path.display(), "created default config");
        Ok(config)
    }

    /// Override fields from environment variables, read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let set = |var: &str| lookup(var).filter(|value| !value.is_empty());

        if let Some(url) = set(ENV_NATS_URL) {
            self.nats_url = url;
        }
        if let Some(file) = set(ENV_LOG_FILE) {
            self.log_file = PathBuf::from(file);
        }
        if let Some(dir) = set(ENV_STATE_DIR) {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(secret) = set(ENV_JWT_SECRET) {
            self.server.jwt_secret = secret;
        }
        if let Some(port) = set(ENV_SERVER_PORT) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_SERVER_PORT,
                value: port,
            })?;
        }
        Ok(())
    }

    /// Create the state directory and the log file (without truncating it).
    pub fn prepare_filesystem(&self) -> Result<()> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| ConfigError::Io { path, source }
        };

        std::fs::create_dir_all(&self.state_dir).map_err(io_err(&self.state_dir))?;
        if let Some(parent) = self.log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .map_err(io_err(&self.log_file))?;
        Ok(())
    }

    /// Get config file path
    pub fn config_path() -> PathBuf {
        match project_dirs() {
            Some(dirs) => dirs.config_dir().join("config.toml"),
            None => PathBuf::from(".logrelay/config.toml"),
        }
    }
}
