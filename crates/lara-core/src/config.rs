//! Application configuration.
//!
//! Loaded from `$LARA_CONFIG` or `~/.config/lara/config.toml`, then
//! overridden by environment variables:
//!
//! ```toml
//! [completion]
//! api_key = "sk-..."
//! model = "gpt-4o-mini"
//! temperature = 0.5
//!
//! [context]
//! max_turns = 30
//! summarize_every = 6
//!
//! [storage]
//! db_path = "/var/lib/lara/lara.db"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lara_ai::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, LlmClient, OpenAIClient,
    UnconfiguredClient,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::context::ContextWindowConfig;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "LARA_CONFIG";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_ENV: &str = "LARA_MODEL";
pub const DB_PATH_ENV: &str = "LARA_DB_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Completion endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl CompletionConfig {
    /// Build the completion client.
    ///
    /// Without an API key every call fails with a configuration error
    /// instead of reaching the network.
    pub fn build_client(&self) -> Arc<dyn LlmClient> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Arc::new(
                OpenAIClient::new(key)
                    .with_model(&self.model)
                    .with_temperature(self.temperature)
                    .with_base_url(&self.base_url),
            ),
            _ => {
                tracing::warn!("{} is not set; completions will fail", API_KEY_ENV);
                Arc::new(UnconfiguredClient::new(API_KEY_ENV, &self.model))
            }
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file. Defaults to `~/.lara/lara.db`.
    pub db_path: Option<String>,
}

impl StorageConfig {
    pub fn resolve_db_path(&self) -> anyhow::Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => crate::paths::database_path(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaraConfig {
    pub completion: CompletionConfig,
    pub context: ContextWindowConfig,
    pub storage: StorageConfig,
}

impl LaraConfig {
    /// Load from the default location with environment overrides applied.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_path(&path)?,
            _ => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file without applying overrides.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `$LARA_CONFIG`, else `~/.config/lara/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|p| p.join("lara").join("config.toml"))
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.completion.api_key = Some(key);
        }
        if let Some(model) = non_empty(MODEL_ENV) {
            self.completion.model = model;
        }
        if let Some(path) = non_empty(DB_PATH_ENV) {
            self.storage.db_path = Some(path);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.max_turns == 0 {
            return Err(ConfigError::Invalid(
                "context.max_turns must be at least 1".to_string(),
            ));
        }
        if self.context.summarize_every == 0 {
            return Err(ConfigError::Invalid(
                "context.summarize_every must be at least 1".to_string(),
            ));
        }
        if self.context.summary_bullets == 0 {
            return Err(ConfigError::Invalid(
                "context.summary_bullets must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(ConfigError::Invalid(format!(
                "completion.temperature must be between 0 and 2, got {}",
                self.completion.temperature
            )));
        }
        if self.completion.model.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "completion.model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = LaraConfig::default();
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert_eq!(config.completion.temperature, 0.5);
        assert_eq!(config.context.max_turns, 30);
        assert_eq!(config.context.summarize_every, 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[context]\nmax_turns = 10\n\n[completion]\nmodel = \"gpt-4o\"\n",
        )
        .unwrap();

        let config = LaraConfig::load_from_path(&path).unwrap();
        assert_eq!(config.context.max_turns, 10);
        assert_eq!(config.context.summarize_every, 6);
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.temperature, 0.5);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[context\n").unwrap();

        let error = LaraConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert!(error.to_string().contains("config.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test"),
            ("LARA_MODEL", "gpt-4.1-mini"),
            ("LARA_DB_PATH", "  "),
        ]);
        let mut config = LaraConfig::default();
        config.apply_env_from(|name| env.get(name).map(|value| value.to_string()));

        assert_eq!(config.completion.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.completion.model, "gpt-4.1-mini");
        assert!(config.storage.db_path.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = LaraConfig::default();
        config.context.max_turns = 0;
        assert!(config.validate().is_err());

        let mut config = LaraConfig::default();
        config.context.summarize_every = 0;
        assert!(config.validate().is_err());

        let mut config = LaraConfig::default();
        config.completion.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_key_builds_unconfigured_client() {
        let config = CompletionConfig::default();
        let client = config.build_client();
        assert_eq!(client.provider(), "unconfigured");

        let config = CompletionConfig {
            api_key: Some("sk-test".to_string()),
            ..CompletionConfig::default()
        };
        assert_eq!(config.build_client().provider(), "openai");
    }
}
