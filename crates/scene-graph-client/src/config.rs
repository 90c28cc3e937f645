//! Client configuration.
//!
//! Precedence, highest first: environment variables (a `.env` file is
//! honored), the JSON config file, built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "SCENE_GRAPH_CONFIG";
pub const ENDPOINT_ENV: &str = "SCENE_GRAPH_ENDPOINT";
pub const TIMEOUT_ENV: &str = "SCENE_GRAPH_TIMEOUT_SECS";
pub const SHOW_OVERVIEW_ENV: &str = "SCENE_GRAPH_SHOW_OVERVIEW";

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const CONFIG_KEYS: &[&str] = &["endpoint", "timeout_secs", "show_overview"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Analysis endpoint receiving the multipart upload.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whether the overview pane starts visible.
    #[serde(default = "default_show_overview")]
    pub show_overview: bool,
}

fn default_endpoint() -> String {
    "http://localhost:8000/predict".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_show_overview() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            show_overview: default_show_overview(),
        }
    }
}

impl Config {
    /// Load configuration from the config file with environment overrides.
    pub fn load() -> ConfigResult<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load a config file without applying environment overrides.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "Loaded config file");
        config.validated()
    }

    /// Apply overrides from an environment lookup.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            self.set("endpoint", &endpoint)?;
        }
        if let Some(timeout) = lookup(TIMEOUT_ENV) {
            self.set("timeout_secs", &timeout)?;
        }
        if let Some(show) = lookup(SHOW_OVERVIEW_ENV) {
            self.set("show_overview", &show)?;
        }
        Ok(self)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> ConfigResult<PathBuf> {
        let path = Self::config_file_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(io_err)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_file_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("dev", "scene-graph", "sg")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "endpoint" => Some(self.endpoint.clone()),
            "timeout_secs" => Some(self.timeout_secs.to_string()),
            "show_overview" => Some(self.show_overview.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        match key {
            "endpoint" => {
                self.endpoint = parse_endpoint(value)?;
            }
            "timeout_secs" => {
                let secs: u64 = value.trim().parse().map_err(|_| {
                    ConfigError::invalid_value(key, format!("not a number: {}", value))
                })?;
                if secs == 0 {
                    return Err(ConfigError::invalid_value(key, "must be at least 1"));
                }
                self.timeout_secs = secs;
            }
            "show_overview" => {
                self.show_overview = parse_bool(value).ok_or_else(|| {
                    ConfigError::invalid_value(key, format!("not a boolean: {}", value))
                })?;
            }
            _ => {
                return Err(ConfigError::UnknownKey(key.to_string()));
            }
        }
        Ok(())
    }

    fn validated(mut self) -> ConfigResult<Self> {
        self.endpoint = parse_endpoint(&self.endpoint)?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid_value("timeout_secs", "must be at least 1"));
        }
        Ok(self)
    }
}

fn parse_endpoint(value: &str) -> ConfigResult<String> {
    let value = value.trim();
    let url = reqwest::Url::parse(value)
        .map_err(|e| ConfigError::invalid_value("endpoint", format!("{}: {}", value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(value.to_string()),
        other => Err(ConfigError::invalid_value(
            "endpoint",
            format!("unsupported scheme '{}'", other),
        )),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
