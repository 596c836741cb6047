//! Settings for a session.
//!
//! An optional settings file lives at `~/.config/agent-company/config.toml`.
//! Command-line flags and environment variables take precedence over it, and
//! built-in defaults fill whatever neither sets.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::AgentSettings;
use crate::cli::Args;
use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT};

/// Contents of the settings file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Chat completion base URL, e.g. `https://api.deepseek.com`.
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Role catalog file (TOML or JSON).
    pub roles: Option<PathBuf>,
    /// Exchanges of history each agent keeps. Unset keeps everything.
    pub history_limit: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no API key: pass --api-key or set DEEPSEEK_API_KEY")]
    MissingApiKey,
    #[error("temperature must be between 0 and 2, got {0}")]
    InvalidTemperature(f32),
    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agent-company")
        .join("config.toml")
}

impl FileConfig {
    /// Load `path`, or the default location when `None`. A missing default
    /// file is silent; anything unreadable or malformed is warned about and
    /// ignored.
    pub fn load(path: Option<&Path>) -> Self {
        let explicit = path.is_some();
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);
        if !explicit && !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(s) => match toml::from_str(&s) {
                Ok(c) => return c,
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Bad settings file, ignoring it"
                ),
            },
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Can't read settings file, ignoring it"
            ),
        }
        Self::default()
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub roles: Option<PathBuf>,
    pub agent: AgentSettings,
}

impl RunConfig {
    pub fn resolve(args: &Args, file: &FileConfig) -> Result<Self, ConfigError> {
        let api_key = args
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let temperature = args
            .temperature
            .or(file.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }

        let timeout = match args.timeout_secs.or(file.timeout_secs) {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            api_key,
            base_url: args
                .base_url
                .clone()
                .or_else(|| file.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
            roles: args.roles.clone().or_else(|| file.roles.clone()),
            agent: AgentSettings {
                model: args
                    .model
                    .clone()
                    .or_else(|| file.model.clone())
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                temperature,
                history_limit: args.history_limit.or(file.history_limit),
            },
        })
    }
}
