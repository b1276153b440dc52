//! TaskCard configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main TaskCard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Reasoning service provider configuration
    pub llm: LlmConfig,

    /// Facet cache behaviour
    pub cache: CacheConfig,

    /// Where tasks and sub-tasks are stored
    pub storage: StorageConfig,

    /// Micro-challenge defaults
    pub challenge: ChallengeConfig,

    /// Tutorial resource search
    pub resources: ResourcesConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .taskcard.yml
        let local_config = PathBuf::from(".taskcard.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/taskcard/taskcard.yml
        if let Some(user_config) = user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, so logging can start before the full load
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = config_path
            .cloned()
            .into_iter()
            .chain(std::iter::once(PathBuf::from(".taskcard.yml")))
            .chain(user_config_path());

        for path in candidates {
            if let Ok(content) = fs::read_to_string(&path) {
                #[derive(Deserialize)]
                struct LogLevelOnly {
                    #[serde(rename = "log-level")]
                    log_level: Option<String>,
                }
                return serde_yaml::from_str::<LogLevelOnly>(&content).ok().and_then(|c| c.log_level);
            }
        }
        None
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("taskcard").join("taskcard.yml"))
}

/// Reasoning service provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "anthropic" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 2048,
            timeout_ms: 60_000,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from the configured environment variable
    ///
    /// Empty values count as unset.
    pub fn get_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

/// Facet cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Expire entries after this many seconds (unset = keep until invalidated)
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the JSON task store
    #[serde(rename = "store-dir")]
    pub store_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/taskcard on Linux)
        let store_dir = dirs::data_dir()
            .map(|d| d.join("taskcard").join("tasks"))
            .unwrap_or_else(|| PathBuf::from(".taskcard"))
            .to_string_lossy()
            .into_owned();

        Self { store_dir }
    }
}

/// Micro-challenge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Countdown length in seconds
    #[serde(rename = "total-seconds")]
    pub total_seconds: u32,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self { total_seconds: 30 }
    }
}

/// Tutorial resource configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Maximum suggestions requested from the reasoning service
    #[serde(rename = "max-results")]
    pub max_results: usize,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self { max_results: 5 }
    }
}
