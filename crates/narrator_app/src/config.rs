use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use narrator_engine::{ChannelSettings, EngineSettings, FetchSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "narrator.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("unknown log level {0:?}")]
    LogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub channel_url: String,
    pub manifest_base_url: String,
    pub state_dir: PathBuf,
    pub cache_key: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_manifest_bytes: u64,
    pub log_level: String,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        let channel = ChannelSettings::default();
        let fetch = FetchSettings::default();
        Self {
            channel_url: channel.url,
            manifest_base_url: fetch.base_url,
            state_dir: PathBuf::from(".narrator"),
            cache_key: "manifest-cache".to_string(),
            connect_timeout_ms: millis(channel.connect_timeout),
            request_timeout_ms: millis(fetch.request_timeout),
            max_manifest_bytes: fetch.max_bytes,
            log_level: "info".to_string(),
            log_destination: LogDestination::Terminal,
        }
    }
}

impl AppConfig {
    /// Load `path` if given; otherwise the default file when present, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .trim()
            .parse()
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            channel: ChannelSettings {
                url: self.channel_url.clone(),
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            },
            fetch: FetchSettings {
                base_url: self.manifest_base_url.clone(),
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                request_timeout: Duration::from_millis(self.request_timeout_ms),
                max_bytes: self.max_manifest_bytes,
                ..FetchSettings::default()
            },
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
