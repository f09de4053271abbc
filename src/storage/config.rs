//! Application configuration.
//!
//! Loaded from `config.toml` in the platform data directory; every section
//! falls back to its defaults when the file or a key is missing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Database settings
    pub database: DatabaseSettings,
    /// Reverse geocoding settings
    pub geocoding: GeocodingSettings,
    /// Leaderboard settings
    pub rankings: RankingSettings,
    /// Read-through cache settings
    pub cache: CacheSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            database: DatabaseSettings::default(),
            geocoding: GeocodingSettings::default(),
            rankings: RankingSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl AppConfig {
    /// Resolve the database path, relative paths living under the data dir.
    pub fn database_path(&self) -> PathBuf {
        if self.database.file_name.is_absolute() {
            self.database.file_name.clone()
        } else {
            self.data_dir.join(&self.database.file_name)
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite file, relative to the data directory unless absolute
    pub file_name: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            file_name: PathBuf::from("podium.db"),
        }
    }
}

/// Reverse geocoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingSettings {
    /// Nominatim-compatible base URL
    pub base_url: String,
    /// User agent sent with every request (Nominatim requires one)
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("podium/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 10,
        }
    }
}

impl GeocodingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Leaderboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    /// Entries returned per leaderboard slice
    pub top_k: usize,
    /// Rows per insert batch during a recompute
    pub batch_size: usize,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            top_k: 50,
            batch_size: 100,
        }
    }
}

/// Read-through cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// How long a cached point total stays fresh, in seconds
    pub points_ttl_secs: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            points_ttl_secs: 30,
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "podium", "Podium")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path(), get_data_dir())
}

/// Load application configuration from `path`, using `data_dir` for relative paths.
pub fn load_config_from(path: &Path, data_dir: PathBuf) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(AppConfig {
            data_dir,
            ..Default::default()
        });
    }

    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = data_dir;

    Ok(config)
}

/// Save application configuration to `path`.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
