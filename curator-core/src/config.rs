//! Application configuration.
//!
//! Settings come from a TOML file with defaults for every field, followed by
//! environment overrides for secrets and the user id. The environment lookup
//! is passed in as a closure so tests never touch the process environment.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "feedcurator.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    File,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionProvider {
    Claude,
    OpenAi,
    Disabled,
}

impl ExpansionProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpansionProvider::Claude => "claude",
            ExpansionProvider::OpenAi => "openai",
            ExpansionProvider::Disabled => "disabled",
        }
    }

    fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            ExpansionProvider::Claude => Some("ANTHROPIC_API_KEY"),
            ExpansionProvider::OpenAi => Some("OPENAI_API_KEY"),
            ExpansionProvider::Disabled => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub path: PathBuf,
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::File,
            path: PathBuf::from("data/feedcurator-state.json"),
            database_url: "sqlite://data/feedcurator.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PostsConfig {
    /// A file path, or an `http(s)://` URL serving the post batch.
    pub source: String,
    pub request_timeout_secs: u64,
}

impl Default for PostsConfig {
    fn default() -> Self {
        Self {
            source: "data/posts.json".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: ExpansionProvider,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub default_suggestions: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: ExpansionProvider::Claude,
            model: None,
            base_url: None,
            timeout_secs: 15,
            default_suggestions: vec![
                "politics".to_string(),
                "health".to_string(),
                "technology".to_string(),
                "sports".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub user_id: String,
    pub log_level: String,
    pub storage: StorageConfig,
    pub posts: PostsConfig,
    pub search: SearchConfig,
    pub llm_api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
            posts: PostsConfig::default(),
            search: SearchConfig::default(),
            llm_api_keys: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Load the file at `path` (a missing file yields defaults) and apply
    /// overrides from the process environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotReadable {
                path: path.display().to_string(),
            })?;
            Self::from_toml(&raw)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        let mut config = config.with_env_overrides(lookup);
        config.disable_expansion_without_key();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(user_id) = lookup("FEEDCURATOR_USER_ID") {
            self.user_id = user_id;
        }
        for provider in [ExpansionProvider::Claude, ExpansionProvider::OpenAi] {
            if let Some(key) = provider.api_key_env_var().and_then(&lookup) {
                self.llm_api_keys.insert(provider.as_str().to_string(), key);
            }
        }
        self
    }

    /// API key for the configured expansion provider, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.llm_api_keys
            .get(self.search.provider.as_str())
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "user_id".to_string(),
            });
        }
        if self.search.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.posts.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "posts.request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.posts.source.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "posts.source".to_string(),
            });
        }
        Ok(())
    }

    /// Semantic expansion is optional: a provider with no API key is
    /// switched to `Disabled` so direct matching keeps working.
    pub fn disable_expansion_without_key(&mut self) {
        let Some(var_name) = self.search.provider.api_key_env_var() else {
            return;
        };
        if self.api_key().is_none() {
            tracing::warn!(
                "{} is not set; related-term search is disabled",
                var_name
            );
            self.search.provider = ExpansionProvider::Disabled;
        }
    }
}
