use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

// Import logging macros
use crate::{log_system_event, log_validation};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// Complete client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub features: FeatureFlags,
    pub logging: LoggingConfig,
}

/// Where the study backend lives and how to talk to it
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout: Option<Duration>,
}

/// Optional parts of the study page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    pub speech_input: bool,
    pub review_mode: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            speech_input: true,
            review_mode: true,
        }
    }
}

/// Logging system configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading client configuration from environment variables");

        let config = Config {
            backend: BackendConfig::from_env()?,
            features: FeatureFlags::from_env(),
            logging: LoggingConfig::from_env(),
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    fn log_configuration_summary(&self) {
        info!(
            backend_url = %self.backend.base_url,
            request_timeout = ?self.backend.request_timeout,
            speech_input = self.features.speech_input,
            review_mode = self.features.review_mode,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let url = &self.backend.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!("STUDY_BACKEND_URL must start with 'http://' or 'https://'"));
        }

        if self.backend.request_timeout == Some(Duration::ZERO) {
            return Err(anyhow!("STUDY_REQUEST_TIMEOUT_SECS must be greater than 0"));
        }

        let base_level = self
            .logging
            .level
            .split(',')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&base_level.as_str()) {
            warn!("Invalid log level '{}', using 'info' as fallback", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self> {
        let base_url = env::var("STUDY_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let request_timeout = match env::var("STUDY_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw.parse::<u64>().map_err(|_| {
                    anyhow!("Invalid STUDY_REQUEST_TIMEOUT_SECS value: '{}'. Must be a whole number of seconds", raw)
                })?;
                Some(Duration::from_secs(secs))
            }
            Err(_) => None,
        };

        Ok(BackendConfig {
            base_url,
            request_timeout,
        })
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout: None,
        }
    }
}

impl FeatureFlags {
    fn from_env() -> Self {
        Self {
            speech_input: env_flag("STUDY_SPEECH_INPUT", true),
            review_mode: env_flag("STUDY_REVIEW_MODE", true),
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,study_companion=debug".to_string());

        LoggingConfig {
            level,
            file_enabled: env_flag("LOG_FILE_ENABLED", true),
            console_enabled: env_flag("LOG_CONSOLE_ENABLED", false),
            log_directory: env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|value| parse_flag(&value))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
