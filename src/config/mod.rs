//! Configuration management for fightgraph
//!
//! Loads the TOML configuration, applies `FIGHTGRAPH_*` environment overrides
//! and validates the result before anything else touches it.

use crate::error::{FightgraphError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub discovery: DiscoveryConfig,
    pub source: SourceConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Entity index file, relative to `data_dir` unless absolute
    pub store_file: PathBuf,
}

impl StorageConfig {
    /// Full path of the entity index document
    pub fn store_path(&self) -> PathBuf {
        if self.store_file.is_absolute() {
            self.store_file.clone()
        } else {
            self.data_dir.join(&self.store_file)
        }
    }
}

/// Request pacing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub min_interval_ms: u64,
    pub adaptive: bool,
    pub burst_window_ms: u64,
    pub burst_quota: usize,
    pub max_interval_ms: u64,
}

impl RateLimitConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn burst_window(&self) -> Duration {
        Duration::from_millis(self.burst_window_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }
}

/// Fetch cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Traversal defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub max_depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_depth: Option<usize>,
    pub expand_sample_size: usize,
}

/// Location of pre-fetched profile documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub profiles_dir: PathBuf,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FightgraphError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FightgraphError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| FightgraphError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply command-line traversal overrides and re-validate the result
    pub fn with_discovery_overrides(
        mut self,
        max_depth: Option<usize>,
        max_per_depth: Option<usize>,
        expand_sample_size: Option<usize>,
    ) -> Result<Self> {
        if let Some(depth) = max_depth {
            self.discovery.max_depth = depth;
        }
        if max_per_depth.is_some() {
            self.discovery.max_per_depth = max_per_depth;
        }
        if let Some(sample) = expand_sample_size {
            self.discovery.expand_sample_size = sample;
        }

        ConfigValidator::validate(&self)?;
        Ok(self)
    }

    /// Apply environment variable overrides
    /// Environment variables in format: FIGHTGRAPH_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("FIGHTGRAPH_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "RATE_LIMIT__MIN_INTERVAL_MS" => {
                self.rate_limit.min_interval_ms = parse_env(path, value)?;
            }
            "RATE_LIMIT__ADAPTIVE" => {
                self.rate_limit.adaptive = parse_env(path, value)?;
            }
            "DISCOVERY__MAX_DEPTH" => {
                self.discovery.max_depth = parse_env(path, value)?;
            }
            "DISCOVERY__MAX_PER_DEPTH" => {
                self.discovery.max_per_depth = Some(parse_env(path, value)?);
            }
            "CACHE__ENABLED" => {
                self.cache.enabled = parse_env(path, value)?;
            }
            "STORAGE__STORE_FILE" => {
                self.storage.store_file = PathBuf::from(value);
            }
            "SOURCE__PROFILES_DIR" => {
                self.source.profiles_dir = PathBuf::from(value);
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            FightgraphError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("fightgraph").join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| FightgraphError::InvalidConfigValue {
            path: path.to_string(),
            message: format!("Cannot parse '{}'", value),
        })
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("~/.fightgraph");

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: data_dir.clone(),
                store_file: PathBuf::from("fighters.json"),
            },
            rate_limit: RateLimitConfig {
                min_interval_ms: 1000,
                adaptive: true,
                burst_window_ms: 60_000,
                burst_quota: 30,
                max_interval_ms: 60_000,
            },
            cache: CacheConfig {
                enabled: true,
                ttl_secs: 3600,
                max_entries: 1000,
            },
            discovery: DiscoveryConfig {
                max_depth: 2,
                max_per_depth: None,
                expand_sample_size: 5,
            },
            source: SourceConfig {
                profiles_dir: data_dir.join("profiles"),
            },
        }
    }
}
