// openw-cli/src/wallet/config.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::ConnectType;
use crate::wallet::constants::*;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_key: String,
    #[serde(default)]
    pub remote_server: String,

    #[serde(default = "default_db_dir")]
    pub db_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_db_timeout_secs")]
    pub db_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_host_node_id")]
    pub host_node_id: String,

    #[serde(default = "default_connect_type")]
    pub connect_type: ConnectType,
}

fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
fn default_db_dir() -> PathBuf {
    app_data_dir().join(DB_DIR_NAME)
}
fn default_log_dir() -> PathBuf {
    app_data_dir().join(LOG_DIR_NAME)
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_db_timeout_secs() -> u64 {
    5
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_host_node_id() -> String {
    openw_core::DEFAULT_HOST_NODE_ID.to_string()
}
fn default_connect_type() -> ConnectType {
    ConnectType::Http
}

impl Default for Config {
    fn default() -> Self {
        Config {
            app_id: String::new(),
            app_key: String::new(),
            remote_server: String::new(),
            db_dir: default_db_dir(),
            log_dir: default_log_dir(),
            log_level: default_log_level(),
            db_timeout_secs: default_db_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            host_node_id: default_host_node_id(),
            connect_type: default_connect_type(),
        }
    }
}

impl Config {
    /// Reads a TOML config file. A missing file yields the defaults, which
    /// leave the required settings empty.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// `<db_dir>/<app_id>.db`
    pub fn database_path(&self) -> PathBuf {
        self.db_dir
            .join(format!("{}.{}", self.app_id, DB_FILE_EXTENSION))
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
