//! Configuration loading and management for digesta.
//!
//! Loads settings from `digesta.toml` with environment variable overrides for sensitive data.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "digesta.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Chat-completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (e.g., "http://localhost:8080/v1")
    pub base_url: String,
    /// Bearer credential; local servers usually ignore it
    pub api_key: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Optional per-request timeout; unset means wait indefinitely
    pub timeout_secs: Option<u64>,
}

/// Email delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub subject: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    /// App password (loaded from environment only)
    #[serde(skip)]
    pub password: Option<String>,
}

/// Pipeline behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of keywords requested from the model
    pub keyword_count: usize,
    /// Abort the run when the summary cannot be generated
    pub summary_required: bool,
    /// Write the finished report here
    pub output: Option<PathBuf>,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Everything needed to open an authenticated SMTP session.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub sender: String,
    pub password: String,
    pub recipient: String,
    pub server: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from the default location (digesta.toml in cwd or home).
    ///
    /// Falls back to defaults when no file exists, so a local server works out of the box.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                let mut config = Config::default();
                config.apply_env();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text without consulting the environment
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override secrets and endpoint from environment variables
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("DIGESTA_LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(url) = std::env::var("DIGESTA_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Ok(password) = std::env::var("DIGESTA_SMTP_PASSWORD") {
            self.email.password = Some(password);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.base_url must not be empty".into()));
        }
        if self.pipeline.keyword_count == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.keyword_count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config").join("digesta").join(CONFIG_FILE);
            if home_config.exists() {
                return Some(home_config);
            }
        }

        None
    }

    /// SMTP settings, or `None` when email delivery is not fully configured
    pub fn mail_settings(&self) -> Option<MailSettings> {
        let email = &self.email;
        Some(MailSettings {
            sender: email.sender.clone()?,
            password: email.password.clone()?,
            recipient: email.recipient.clone()?,
            server: email.smtp_server.clone(),
            port: email.smtp_port,
        })
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            api_key: "not-needed".to_string(),
            model: "localai".to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: None,
            recipient: None,
            subject: "AI Article Analysis Report".to_string(),
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            password: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keyword_count: 5,
            summary_required: true,
            output: None,
        }
    }
}
