//! Configuration management for `abacus`.
//!
//! Configuration is resolved in layers, later layers winning:
//! - Built-in defaults
//! - User config (`<config_dir>/config.yaml`)
//! - Environment variables and CLI flags (merged by clap into [`Overrides`])

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{AbacusError, Result};
use crate::live::LiveSettings;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const CONFIG_FILE: &str = "config.yaml";
pub const PROJECTS_FILE: &str = "projects.json";

/// Optional keys accepted in `config.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debounce_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub keep_alive_secs: Option<u64>,
    pub subscriber_capacity: Option<usize>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config_dir: Option<PathBuf>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub config_dir: PathBuf,
    pub live: LiveSettings,
}

impl Config {
    /// `~/.abacus`, or `./.abacus` when no home directory is known.
    #[must_use]
    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".abacus")
    }

    /// Resolve configuration from defaults, the config file and overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` if `config.yaml` exists but is invalid, `Io` if it
    /// cannot be read, or `Config` if a value is out of range.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let config_dir = overrides
            .config_dir
            .clone()
            .unwrap_or_else(Self::default_config_dir);
        let file = load_file_config(&config_dir.join(CONFIG_FILE))?;
        Self::resolve(config_dir, &file, overrides)
    }

    /// Merge already-loaded layers.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a value is out of range.
    pub fn resolve(config_dir: PathBuf, file: &FileConfig, overrides: &Overrides) -> Result<Self> {
        let defaults = LiveSettings::default();
        let live = LiveSettings {
            debounce: file
                .debounce_ms
                .map_or(defaults.debounce, Duration::from_millis),
            poll_interval: file
                .poll_interval_ms
                .map_or(defaults.poll_interval, Duration::from_millis),
            keep_alive: file
                .keep_alive_secs
                .map_or(defaults.keep_alive, Duration::from_secs),
            subscriber_capacity: file
                .subscriber_capacity
                .unwrap_or(defaults.subscriber_capacity),
        };

        if live.subscriber_capacity == 0 {
            return Err(AbacusError::Config(
                "subscriber_capacity must be at least 1".to_string(),
            ));
        }
        if live.poll_interval.is_zero() || live.keep_alive.is_zero() {
            return Err(AbacusError::Config(
                "poll_interval_ms and keep_alive_secs must be non-zero".to_string(),
            ));
        }

        Ok(Self {
            host: overrides
                .host
                .clone()
                .or_else(|| file.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            config_dir,
            live,
        })
    }

    /// Location of the project registry.
    #[must_use]
    pub fn projects_file(&self) -> PathBuf {
        self.config_dir.join(PROJECTS_FILE)
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read `config.yaml`; a missing file yields defaults.
///
/// # Errors
///
/// Returns `Io` if the file exists but cannot be read, or `ConfigParse` if it
/// is not valid.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No config file");
            return Ok(FileConfig::default());
        }
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(&content).map_err(|source| AbacusError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
