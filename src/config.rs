//! # Configuration
//!
//! Persistent client settings stored as TOML, by default in
//! `<config dir>/kt-cli/config.toml`:
//!
//! ```toml
//! token = "..."
//! user_id = "..."
//! endpoint = "https://resistance.go-kt.com"
//! connect_timeout_secs = 3
//! timeout_secs = 5
//! ```
//!
//! `KT_CLI_ENDPOINT` overrides the endpoint. The token and the encryption password can also come
//! from `KT_CLI_TOKEN` and `KT_CLI_PASSWD`, which the CLI reads through its flags.
//!
//! The file holds the access token, so it is written with 0600 permissions on Unix.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config as ConfigLoader, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{KtError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://resistance.go-kt.com";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

const CONFIG_DIR: &str = "kt-cli";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "KT_CLI_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: String::new(),
            user_id: String::new(),
            endpoint: default_endpoint(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// `<config dir>/kt-cli/config.toml`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    /// Load `path`, or defaults when it does not exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut cfg = if path.exists() {
            let path_str = path
                .to_str()
                .ok_or_else(|| KtError::Config("Invalid config path".into()))?;
            ConfigLoader::builder()
                .add_source(File::new(path_str, FileFormat::Toml))
                .build()
                .and_then(|loaded| loaded.try_deserialize::<Config>())
                .map_err(|err| KtError::Config(format!("Failed to load config file: {err}")))?
        } else {
            Config::default()
        };

        if let Ok(endpoint) = env::var(format!("{ENV_PREFIX}ENDPOINT")) {
            if !endpoint.trim().is_empty() {
                cfg.endpoint = endpoint.trim().to_string();
            }
        }

        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = toml::to_string(self)
            .map_err(|err| KtError::Config(format!("Failed to serialize config: {err}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    /// JSON-RPC endpoint.
    pub fn api_url(&self) -> String {
        format!("{}/json-rpc", self.base_url())
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url())
    }

    pub fn ping_url(&self) -> String {
        format!("{}/ping", self.base_url())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
