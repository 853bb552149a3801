use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{Result, UmbrellaError};

pub const KNOWN_LLM_PROVIDERS: &[&str] = &["gemini", "ollama", "openai"];
pub const KNOWN_EMBEDDING_PROVIDERS: &[&str] = &["gemini", "ollama", "openai"];
pub const KNOWN_INDEX_BACKENDS: &[&str] = &["local", "memory", "helix"];


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UmbrellaConfig {

    pub weather_api_key: Option<String>,
    pub weather_base_url: String,
    pub timeout: u64,


    pub llm_provider: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_temperature: f32,


    pub llm_fallback_enabled: bool,
    pub llm_fallback_url: String,
    pub llm_fallback_model: String,


    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_url: String,
    pub embedding_api_key: Option<String>,


    pub embedding_fallback_enabled: bool,
    pub embedding_fallback_url: String,
    pub embedding_fallback_model: String,


    pub index_backend: String,
    pub persist_directory: PathBuf,
    pub collection_name: String,
    pub helix_host: String,
    pub helix_port: u16,


    pub history_limit: usize,
}

impl UmbrellaConfig {

    pub fn new() -> Self {
        Self {
            weather_api_key: None,
            weather_base_url: crate::DEFAULT_WEATHER_URL.to_string(),
            timeout: 30,

            llm_provider: "gemini".to_string(),
            llm_model: crate::DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            llm_base_url: None,
            llm_temperature: 0.3,

            llm_fallback_enabled: false,
            llm_fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            llm_fallback_model: "llama3.2".to_string(),

            embedding_provider: "gemini".to_string(),
            embedding_model: crate::DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_api_key: None,

            embedding_fallback_enabled: false,
            embedding_fallback_url: crate::DEFAULT_OLLAMA_URL.to_string(),
            embedding_fallback_model: "nomic-embed-text".to_string(),

            index_backend: "local".to_string(),
            persist_directory: PathBuf::from(crate::DEFAULT_PERSIST_DIR),
            collection_name: crate::DEFAULT_COLLECTION.to_string(),
            helix_host: "localhost".to_string(),
            helix_port: crate::DEFAULT_HELIX_PORT,

            history_limit: crate::DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Defaults, then the optional TOML file, then `UMBRELLA_*` variables,
    /// then the well-known credential variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading config file {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        } else {
            builder = builder.add_source(File::with_name("umbrella").required(false));
        }
        builder = builder.add_source(Environment::with_prefix("UMBRELLA").try_parsing(true));

        let mut config: UmbrellaConfig = builder.build()?.try_deserialize()?;
        config.apply_credentials_from_env();
        Ok(config)
    }


    fn apply_credentials_from_env(&mut self) {
        if let Ok(key) = std::env::var("OPENWEATHER_API_KEY") {
            self.weather_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            if self.llm_provider == "gemini" && self.llm_api_key.is_none() {
                self.llm_api_key = Some(key.clone());
            }
            if self.embedding_provider == "gemini" && self.embedding_api_key.is_none() {
                self.embedding_api_key = Some(key);
            }
        }
    }

    /// Missing credentials and unknown provider names are fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.weather_api_key.as_deref().is_none_or(str::is_empty) {
            return Err(UmbrellaError::Config(
                "OPENWEATHER_API_KEY not found in environment variables".to_string(),
            ));
        }
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm_provider.as_str()) {
            return Err(UmbrellaError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm_provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(UmbrellaError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }
        if !KNOWN_INDEX_BACKENDS.contains(&self.index_backend.as_str()) {
            return Err(UmbrellaError::Config(format!(
                "Unknown index backend: {}. Supported: {}",
                self.index_backend,
                KNOWN_INDEX_BACKENDS.join(", ")
            )));
        }
        if self.llm_provider == "gemini" && self.llm_api_key.is_none() {
            return Err(UmbrellaError::Config(
                "GOOGLE_API_KEY not found in environment variables".to_string(),
            ));
        }
        if self.llm_provider == "openai" && self.llm_api_key.is_none() {
            return Err(UmbrellaError::Config(
                "UMBRELLA_LLM_API_KEY is required for the openai provider".to_string(),
            ));
        }
        if self.embedding_provider == "gemini" && self.embedding_api_key.is_none() {
            return Err(UmbrellaError::Config(
                "GOOGLE_API_KEY not found in environment variables".to_string(),
            ));
        }
        if self.embedding_provider == "openai" && self.embedding_api_key.is_none() {
            return Err(UmbrellaError::Config(
                "UMBRELLA_EMBEDDING_API_KEY is required for the openai provider".to_string(),
            ));
        }
        if self.history_limit == 0 {
            return Err(UmbrellaError::Config("history_limit must be positive".to_string()));
        }
        Ok(())
    }


    pub fn collection_path(&self) -> PathBuf {
        self.persist_directory.join(format!("{}.jsonl", self.collection_name))
    }
}

impl Default for UmbrellaConfig {
    fn default() -> Self {
        Self::new()
    }
}
