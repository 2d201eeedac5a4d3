//! Configuration structures.
//!
//! Configuration is loaded once from a YAML file before any tool call is
//! possible and is read-only afterwards.

use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Hard ceiling the Uptrace API imposes on result limits.
pub const LIMIT_CEILING: u32 = 10_000;

/// Longest default time window accepted; `now - window` must stay representable.
pub const MAX_TIME_WINDOW: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Environment variable that overrides `uptrace.api_token`.
pub const API_TOKEN_ENV: &str = "UPTRACE_API_TOKEN";

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Defaults applied to omitted tool arguments.
    #[serde(default, alias = "default")]
    pub defaults: DefaultsConfig,

    /// Uptrace API connection.
    #[serde(default)]
    pub uptrace: UptraceConfig,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format; logs always go to stderr.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

/// Defaults for omitted tool arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Result limit used when the caller supplies none.
    pub limit: u32,

    /// Query string used when the caller supplies none (empty = no filter).
    pub query: String,

    /// Length of the time window ending "now" used when no bounds are given.
    #[serde(with = "humantime_serde")]
    pub time_window: Duration,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            query: String::new(),
            time_window: Duration::from_secs(3600),
        }
    }
}

/// Uptrace API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UptraceConfig {
    /// Base URL of the Uptrace API.
    pub api_url: String,

    /// Bearer token attached to every outbound call.
    pub api_token: String,

    /// Project used when the caller omits one.
    pub project_id: i64,

    /// Per-request timeout of the HTTP client (none = client default).
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for UptraceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api2.uptrace.dev".to_string(),
            api_token: String::new(),
            project_id: 0,
            timeout: None,
        }
    }
}

impl Config {
    /// Read, parse and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("read config file {}: {}", path.display(), e)))?;

        let mut config = Self::parse(&text)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML text. Does not validate.
    pub fn parse(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::config(format!("parse config: {}", e)))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            if !token.is_empty() {
                self.uptrace.api_token = token;
            }
        }
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.uptrace.project_id == 0 {
            return Err(Error::config("uptrace.project_id must be set to a non-zero project id"));
        }
        if self.uptrace.api_url.trim().is_empty() {
            return Err(Error::config("uptrace.api_url cannot be empty"));
        }
        reqwest::Url::parse(&self.uptrace.api_url)
            .map_err(|e| Error::config(format!("uptrace.api_url is not a valid URL: {}", e)))?;
        if self.uptrace.api_token.is_empty() {
            return Err(Error::config(format!(
                "uptrace.api_token cannot be empty (or set {})",
                API_TOKEN_ENV
            )));
        }
        if self.defaults.limit == 0 || self.defaults.limit > LIMIT_CEILING {
            return Err(Error::config(format!(
                "defaults.limit must be between 1 and {}, got {}",
                LIMIT_CEILING, self.defaults.limit
            )));
        }
        if self.defaults.time_window.is_zero() {
            return Err(Error::config("defaults.time_window must be positive"));
        }
        if self.defaults.time_window > MAX_TIME_WINDOW {
            return Err(Error::config(format!(
                "defaults.time_window is out of range (at most {} days)",
                MAX_TIME_WINDOW.as_secs() / 86_400
            )));
        }
        Ok(())
    }
}
