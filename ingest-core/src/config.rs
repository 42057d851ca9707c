use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::provider::openweather::DEFAULT_API_URL;

pub const DEFAULT_DB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DB_NAME: &str = "weather_db";
pub const DEFAULT_COLLECTION: &str = "weather_data";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Weather provider section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

/// Document store section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StoreConfig {
    pub uri: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// location = "Toronto"
///
/// [provider]
/// api_key = "..."
///
/// [store]
/// uri = "mongodb://localhost:27017"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Location queried when none is given on the command line.
    pub location: Option<String>,

    /// Timeout for each network call, in seconds.
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Values given on the command line or through the environment. They take
/// precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub location: Option<String>,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub db_uri: Option<String>,
    pub db_name: Option<String>,
    pub collection: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, PartialEq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub api_url: String,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub location: String,
    pub provider: ProviderSettings,
    pub store: StoreSettings,
    pub timeout: Duration,
}

impl Config {
    /// Load config from the default location, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from `path`, or return an empty default if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(message = "no config file, using defaults", path = %path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-ingest", "weather-ingest")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Merge `overrides` over this config and fill in defaults.
    pub fn resolve(&self, overrides: Overrides) -> Result<Settings> {
        let location = overrides
            .location
            .or_else(|| self.location.clone())
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No location given.\n\
                     Hint: pass a location argument or run `weather-ingest configure` to set a default."
                )
            })?;

        let api_key = overrides
            .api_key
            .or_else(|| self.provider.api_key.clone())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured for the weather provider.\n\
                     Hint: pass --api-key, set OPENWEATHER_API_KEY, or run `weather-ingest configure`."
                )
            })?;

        let timeout_secs = overrides
            .timeout_secs
            .or(self.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(anyhow!("Timeout must be at least one second"));
        }

        Ok(Settings {
            location,
            provider: ProviderSettings {
                api_key,
                api_url: pick(overrides.api_url, &self.provider.api_url, DEFAULT_API_URL),
            },
            store: StoreSettings {
                uri: pick(overrides.db_uri, &self.store.uri, DEFAULT_DB_URI),
                database: pick(overrides.db_name, &self.store.database, DEFAULT_DB_NAME),
                collection: pick(overrides.collection, &self.store.collection, DEFAULT_COLLECTION),
            },
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn pick(first: Option<String>, second: &Option<String>, default: &str) -> String {
    first
        .or_else(|| second.clone())
        .unwrap_or_else(|| default.to_string())
}
