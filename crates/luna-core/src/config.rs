use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::retrieval::{QueryType, RetrievalConfig};

pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Luna, a friendly and knowledgeable travel assistant. \
Your job is to answer questions about countries, tourist attractions, hotels, food, culture, and travel tips. \
Use the information available in the search results (PDF data and index) as your main source. \
If you cannot find the answer, politely say that you don't have enough information.";

/// Settings as they appear in the config file. Every field is optional;
/// environment variables fill in or override whatever is missing.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub openai_endpoint: Option<String>,
    pub openai_api_key: Option<String>,
    pub api_version: Option<String>,
    pub chat_model: Option<String>,
    pub embedding_model: Option<String>,
    pub search_endpoint: Option<String>,
    pub search_key: Option<String>,
    pub index_name: Option<String>,
    pub query_type: Option<String>,
    pub system_prompt: Option<String>,
}

/// Connection settings for the completion endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

/// Fully resolved startup configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientSettings,
    pub chat_model: String,
    pub retrieval: RetrievalConfig,
    pub system_prompt: String,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default location, returning an empty config if the file
    /// doesn't exist yet
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&config_content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("luna").join("config.json"))
    }

    /// Overlay values from the environment. `lookup` is `std::env::var` in
    /// the binary and a map in tests.
    pub fn merge_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |name: &str, current: Option<String>| {
            lookup(name).filter(|v| !v.trim().is_empty()).or(current)
        };

        self.openai_endpoint = pick("OPENAI_ENDPOINT", self.openai_endpoint);
        self.openai_api_key = pick("OPENAI_API_KEY", self.openai_api_key);
        self.api_version = pick("OPENAI_API_VERSION", self.api_version);
        self.chat_model = pick("CHAT_MODEL", self.chat_model);
        self.embedding_model = pick("EMBEDDING_MODEL", self.embedding_model);
        self.search_endpoint = pick("SEARCH_ENDPOINT", self.search_endpoint);
        self.search_key = pick("SEARCH_KEY", self.search_key);
        self.index_name = pick("INDEX_NAME", self.index_name);
        self.query_type = pick("QUERY_TYPE", self.query_type);
        self
    }

    /// Validate and turn into `Settings`. The endpoint and key are checked
    /// first so a bare install reports the credential problem.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let endpoint = required(&self.openai_endpoint, "OPENAI_ENDPOINT")?;
        let api_key = required(&self.openai_api_key, "OPENAI_API_KEY")?;
        let chat_model = required(&self.chat_model, "CHAT_MODEL")?;
        let embedding_model = required(&self.embedding_model, "EMBEDDING_MODEL")?;
        let search_endpoint = required(&self.search_endpoint, "SEARCH_ENDPOINT")?;
        let search_key = required(&self.search_key, "SEARCH_KEY")?;
        let index_name = required(&self.index_name, "INDEX_NAME")?;

        let query_type = match self.query_type.as_deref() {
            None => QueryType::default(),
            Some(raw) => QueryType::from_str(raw).ok_or_else(|| ConfigError::Invalid {
                name: "QUERY_TYPE",
                reason: format!("unknown query type {:?}", raw),
            })?,
        };

        Ok(Settings {
            client: ClientSettings {
                endpoint,
                api_key,
                api_version: self
                    .api_version
                    .clone()
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            },
            chat_model,
            retrieval: RetrievalConfig::new(search_endpoint, index_name, search_key, embedding_model)
                .with_query_type(query_type),
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        })
    }

    /// One line per field for `luna config`, secrets masked
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let shown = |v: &Option<String>| v.clone().unwrap_or_else(|| "(unset)".to_string());
        let masked = |v: &Option<String>| match v {
            Some(s) if s.chars().count() > 4 => {
                let tail: String = s.chars().skip(s.chars().count() - 4).collect();
                format!("****{}", tail)
            }
            Some(_) => "****".to_string(),
            None => "(unset)".to_string(),
        };

        vec![
            ("OPENAI_ENDPOINT", shown(&self.openai_endpoint)),
            ("OPENAI_API_KEY", masked(&self.openai_api_key)),
            ("OPENAI_API_VERSION", shown(&self.api_version)),
            ("CHAT_MODEL", shown(&self.chat_model)),
            ("EMBEDDING_MODEL", shown(&self.embedding_model)),
            ("SEARCH_ENDPOINT", shown(&self.search_endpoint)),
            ("SEARCH_KEY", masked(&self.search_key)),
            ("INDEX_NAME", shown(&self.index_name)),
            ("QUERY_TYPE", shown(&self.query_type)),
        ]
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(name))
}
