use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use pinfeed_core::QueueSettings;
use pinfeed_engine::{EngineConfig, HttpSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::logging::LogDestination;

const CONFIG_FILENAME: &str = "pinfeed.ron";
const CONFIG_PATH_VAR: &str = "PINFEED_CONFIG";
const TOKEN_VARS: &[&str] = &["TOKEN", "TELEGRAM_BOT_TOKEN"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("bot token missing; set TOKEN or TELEGRAM_BOT_TOKEN")]
    MissingToken,
}

/// Discovery strategy used to refill queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Scrape the search results page.
    #[default]
    Html,
    /// Page through the JSON search resource.
    ResourceApi,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(Strategy::Html),
            "api" | "resource" | "resourceapi" => Ok(Strategy::ResourceApi),
            other => Err(format!("unknown strategy {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub block_size: usize,
    pub low_watermark: usize,
    pub max_fetch_attempts: u32,
    pub fetch_timeout_secs: u64,
    pub block_wait_secs: u64,
    pub max_items_per_fetch: usize,
    pub strategy: Strategy,
    pub base_url: String,
    pub log: LogDestination,
    /// File the values were read from; `None` when running on defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let queue = QueueSettings::default();
        Self {
            block_size: queue.block_size,
            low_watermark: queue.low_watermark,
            max_fetch_attempts: queue.max_fetch_attempts,
            fetch_timeout_secs: 30,
            block_wait_secs: 5,
            max_items_per_fetch: HttpSettings::default().max_items_per_fetch,
            strategy: Strategy::default(),
            base_url: "https://www.pinterest.com".to_string(),
            log: LogDestination::default(),
            source: None,
        }
    }
}

impl AppConfig {
    /// Loads the RON file (if any), applies environment overrides and validates.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
        let mut config = Self::from_file(&path)?;
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut config: Self = ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        override_from(&lookup, "PINFEED_BLOCK_SIZE", &mut self.block_size)?;
        override_from(&lookup, "PINFEED_LOW_WATERMARK", &mut self.low_watermark)?;
        override_from(
            &lookup,
            "PINFEED_MAX_FETCH_ATTEMPTS",
            &mut self.max_fetch_attempts,
        )?;
        override_from(
            &lookup,
            "PINFEED_FETCH_TIMEOUT_SECS",
            &mut self.fetch_timeout_secs,
        )?;
        override_from(&lookup, "PINFEED_BLOCK_WAIT_SECS", &mut self.block_wait_secs)?;
        override_from(&lookup, "PINFEED_STRATEGY", &mut self.strategy)?;
        override_from(&lookup, "PINFEED_BASE_URL", &mut self.base_url)?;
        override_from(&lookup, "PINFEED_LOG", &mut self.log)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::Invalid("block_size must be at least 1".into()));
        }
        if self.max_fetch_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_fetch_attempts must be at least 1".into(),
            ));
        }
        if self.low_watermark < self.block_size {
            return Err(ConfigError::Invalid(format!(
                "low_watermark ({}) must cover a full block ({})",
                self.low_watermark, self.block_size
            )));
        }
        self.base_url()?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidValue {
            key: "base_url".to_string(),
            value: self.base_url.clone(),
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            queue: QueueSettings {
                block_size: self.block_size,
                low_watermark: self.low_watermark,
                max_fetch_attempts: self.max_fetch_attempts,
            },
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            block_wait: Duration::from_secs(self.block_wait_secs),
        }
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            max_items_per_fetch: self.max_items_per_fetch,
            ..HttpSettings::default()
        }
    }
}

/// Reads the bot credential from the environment.
pub fn bot_token() -> Result<String, ConfigError> {
    token_from(|key| env::var(key).ok())
}

fn token_from<F>(lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    TOKEN_VARS
        .iter()
        .filter_map(|key| lookup(*key))
        .map(|token| token.trim().to_string())
        .find(|token| !token.is_empty())
        .ok_or(ConfigError::MissingToken)
}

fn override_from<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    *target = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.clone(),
    })?;
    Ok(())
}
