/// Configuration for the review assistant
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::ai::normalize_api_key;

/// The only environment variable the crate reads.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewerConfig {
    pub model_id: String,
    pub endpoint: String,
    pub request_timeout_secs: u64,
    /// Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ReviewerConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.into(),
            endpoint: DEFAULT_ENDPOINT.into(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }
}

impl ReviewerConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config.normalized())
    }

    /// Load from JSON string (for UI integration)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    /// Convert to JSON string (for UI integration)
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Fills the credential from `GEMINI_API_KEY` when the config has none.
    pub fn with_env_credentials(self) -> Self {
        self.with_credential_from(std::env::var(API_KEY_ENV).ok())
    }

    fn with_credential_from(mut self, value: Option<String>) -> Self {
        if self.api_key.is_none() {
            self.api_key = normalize_api_key(value);
        }
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn normalized(mut self) -> Self {
        self.api_key = normalize_api_key(self.api_key.take());
        if self.model_id.trim().is_empty() {
            self.model_id = DEFAULT_MODEL_ID.into();
        }
        if self.endpoint.trim().is_empty() {
            self.endpoint = DEFAULT_ENDPOINT.into();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        self
    }
}
