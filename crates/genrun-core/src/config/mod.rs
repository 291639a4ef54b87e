//! YAML configuration with environment fallbacks.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenrunConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_mount_target")]
    pub mount_target: String,
}

impl Default for GenrunConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            queue_capacity: default_queue_capacity(),
            store_path: default_store_path(),
            mount_target: default_mount_target(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_queue_capacity() -> usize {
    crate::tasks::queue::DEFAULT_QUEUE_CAPACITY
}

fn default_store_path() -> PathBuf {
    PathBuf::from("genrun.db")
}

fn default_mount_target() -> String {
    "/app".to_string()
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from a YAML file, falling back to defaults plus environment
    /// variables when the file does not exist.
    pub async fn from_source<P: AsRef<Path>>(path: P) -> Result<GenrunConfig, AgentError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path).await
        } else {
            log::info!(
                "config file {} not found, using defaults and environment",
                path.display()
            );
            let mut config = GenrunConfig::default();
            Self::resolve_environment(&mut config);
            Ok(config)
        }
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<GenrunConfig, AgentError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AgentError::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<GenrunConfig, AgentError> {
        let mut config: GenrunConfig = serde_yaml::from_str(content)
            .map_err(|e| AgentError::Config(format!("failed to parse YAML config: {}", e)))?;
        Self::resolve_environment(&mut config);
        Ok(config)
    }

    fn resolve_environment(config: &mut GenrunConfig) {
        if config.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                config.api_key = key;
            }
        }
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base;
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = ConfigLoader::from_str("api_key: sk-test\n").unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.mount_target, "/app");
        assert_eq!(config.store_path, PathBuf::from("genrun.db"));
    }

    #[test]
    fn test_explicit_values_win() {
        let yaml = "api_key: sk-test\nbase_url: http://localhost:8080/v1\nmodel: local-model\nqueue_capacity: 3\n";
        let config = ConfigLoader::from_str(yaml).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.model, "local-model");
        assert_eq!(config.queue_capacity, 3);
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let err = ConfigLoader::from_str("api_key: [unclosed").unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
