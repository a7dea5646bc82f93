use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::screens::SortMode;
use crate::tmdb::DEFAULT_BASE_URL;

/// Environment variable that overrides `api.api_key`
pub const API_KEY_ENV: &str = "MOVIEBOX_API_KEY";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    /// File value of `api.api_key` while the environment overrides it
    #[serde(skip)]
    stored_api_key: Option<String>,
}

/// Remote catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Search endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// TMDB v3 API key
    #[serde(default)]
    pub api_key: String,
    /// Response language
    #[serde(default = "default_language")]
    pub language: String,
    /// Include adult titles in search results
    #[serde(default)]
    pub include_adult: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            language: default_language(),
            include_adult: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

/// List display settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Initial sort mode for the list screen
    #[serde(default)]
    pub sort: SortMode,
}

/// Connectivity probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Host to probe; defaults to the API host when unset
    #[serde(default)]
    pub probe_host: Option<String>,
    /// Probe connect timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_host: None,
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

fn default_probe_timeout_ms() -> u64 {
    1500
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "moviebox", "Moviebox")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            tracing::debug!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("No configuration file found, using defaults");
            Self::default()
        };

        config.apply_env(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Override the API key from the environment value, if set and non-empty
    fn apply_env(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using API key from {}", API_KEY_ENV);
            let stored = std::mem::replace(&mut self.api.api_key, key);
            self.stored_api_key.get_or_insert(stored);
        }
    }

    /// File contents for this configuration. An API key taken from the
    /// environment is never written; the file keeps its own value.
    fn to_file_toml(&self) -> Result<String> {
        let mut file = self.clone();
        if let Some(stored) = file.stored_api_key.take() {
            file.api.api_key = stored;
        }
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        let content = self.to_file_toml()?;
        std::fs::write(&path, content)?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Read a value by dotted key (e.g. `api.language`)
    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["api", "base_url"] => Ok(self.api.base_url.clone()),
            ["api", "api_key"] => Ok(if self.api.api_key.is_empty() {
                "<not set>".to_string()
            } else {
                "<set>".to_string()
            }),
            ["api", "language"] => Ok(self.api.language.clone()),
            ["api", "include_adult"] => Ok(self.api.include_adult.to_string()),
            ["api", "timeout_secs"] => Ok(self.api.timeout_secs.to_string()),
            ["display", "sort"] => Ok(self.display.sort.to_string()),
            ["network", "probe_host"] => Ok(self
                .network
                .probe_host
                .clone()
                .unwrap_or_else(|| "<api host>".to_string())),
            ["network", "probe_timeout_ms"] => Ok(self.network.probe_timeout_ms.to_string()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    /// Set a value by dotted key
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["api", "base_url"] => self.api.base_url = value.to_string(),
            ["api", "api_key"] => {
                self.api.api_key = value.to_string();
                self.stored_api_key = None;
            }
            ["api", "language"] => self.api.language = value.to_string(),
            ["api", "include_adult"] => self.api.include_adult = value.parse()?,
            ["api", "timeout_secs"] => self.api.timeout_secs = value.parse()?,
            ["display", "sort"] => self.display.sort = value.parse()?,
            ["network", "probe_host"] => {
                self.network.probe_host = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            ["network", "probe_timeout_ms"] => self.network.probe_timeout_ms = value.parse()?,
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }
}
