//! Plugin configuration.
use crate::error::{BackpackError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CAPACITY: usize = 6;
pub const DEFAULT_OPEN_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_STORE_NAME: &str = "Backpacks";

/// Runtime configuration for the plugin and its host.
#[derive(Clone, Debug)]
pub struct Config {
    /// Slots in each newly allocated backpack
    pub container_capacity: usize,
    /// Wait between the backpack command and the backpack opening
    pub open_delay: Duration,
    pub data_dir: PathBuf,
    pub store_name: String,
    pub bind_addr: String,
    /// Grant the use permission to every player that logs in
    pub grant_on_connect: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            container_capacity: DEFAULT_CAPACITY,
            open_delay: DEFAULT_OPEN_DELAY,
            data_dir: PathBuf::from("data"),
            store_name: DEFAULT_STORE_NAME.to_string(),
            bind_addr: "127.0.0.1:8080".to_string(),
            grant_on_connect: true,
        }
    }
}

/// The part of the configuration kept in the plugin's config file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_capacity")]
    pub container_capacity: usize,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            container_capacity: DEFAULT_CAPACITY,
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl ConfigFile {
    /// Reads the config file, writing the defaults first if it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            let defaults = Self::default();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(io_error(path))?;
            }
            let json = serde_json::to_string_pretty(&defaults).map_err(json_error(path))?;
            fs::write(path, json).map_err(io_error(path))?;
            tracing::info!("Wrote default config to {}", path.display());
            return Ok(defaults);
        }

        let json = fs::read_to_string(path).map_err(io_error(path))?;
        serde_json::from_str(&json).map_err(json_error(path))
    }
}

impl Config {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `BACKPACKS_CAPACITY` - Slots per backpack (default: 6)
    /// - `BACKPACKS_OPEN_DELAY_MS` - Delay before a requested backpack opens (default: 500)
    /// - `BACKPACKS_DATA_DIR` - Directory for the store and config file (default: `data`)
    /// - `BACKPACKS_STORE` - Store name (default: `Backpacks`)
    /// - `BACKPACKS_BIND` - Listen address of the host server (default: `127.0.0.1:8080`)
    /// - `BACKPACKS_GRANT_ALL` - Grant `backpacks.use` on login (default: true)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(capacity) = read_env::<usize>("BACKPACKS_CAPACITY") {
            config.container_capacity = capacity.max(1);
        }
        if let Some(millis) = read_env::<u64>("BACKPACKS_OPEN_DELAY_MS") {
            config.open_delay = Duration::from_millis(millis);
        }
        if let Ok(dir) = env::var("BACKPACKS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(name) = env::var("BACKPACKS_STORE") {
            config.store_name = name;
        }
        if let Ok(addr) = env::var("BACKPACKS_BIND") {
            config.bind_addr = addr;
        }
        if let Some(grant) = read_env::<bool>("BACKPACKS_GRANT_ALL") {
            config.grant_on_connect = grant;
        }

        config
    }

    /// Environment first, then the config file for anything the environment
    /// left unset.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_env();
        let file = ConfigFile::load_or_init(&config.config_path())?;
        if read_env::<usize>("BACKPACKS_CAPACITY").is_none() {
            config.container_capacity = file.container_capacity.max(1);
        }
        Ok(config)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.config.json", self.store_name))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BackpackError + '_ {
    move |source| BackpackError::ConfigIo {
        path: path.to_path_buf(),
        source,
    }
}

fn json_error(path: &Path) -> impl FnOnce(serde_json::Error) -> BackpackError + '_ {
    move |source| BackpackError::ConfigJson {
        path: path.to_path_buf(),
        source,
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
