

use std::sync::Arc;

use super::embeddings::EmbeddingGenerator;
use super::providers::base::LlmProvider;
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::gemini::GeminiProvider;
use super::providers::ollama::OllamaProvider;
use super::providers::openai::OpenAiCompatProvider;
use crate::core::config::UmbrellaConfig;
use crate::core::error::{Result, UmbrellaError};
use crate::{DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL, DEFAULT_OLLAMA_URL};


pub struct LlmProviderFactory;

impl LlmProviderFactory {

    pub fn create(
        provider: &str,
        model: &str,
        api_key: Option<&str>,
        base_url: Option<&str>,
        temperature: f64,
        timeout_secs: u64,
    ) -> Result<Arc<dyn LlmProvider>> {
        let require_key = || {
            api_key
                .map(str::to_string)
                .ok_or_else(|| UmbrellaError::Config(format!("API key required for provider {provider}")))
        };

        let provider: Arc<dyn LlmProvider> = match provider {
            "gemini" => Arc::new(GeminiProvider::new(
                require_key()?,
                model,
                base_url.map(String::from),
                temperature,
                timeout_secs,
            )),
            "openai" => Arc::new(OpenAiCompatProvider::new(
                require_key()?,
                model,
                base_url.map(String::from),
                temperature,
                timeout_secs,
            )),
            "ollama" => Arc::new(OllamaProvider::new(
                base_url.unwrap_or(DEFAULT_OLLAMA_URL),
                model,
                temperature,
                timeout_secs,
            )),
            other => {
                return Err(UmbrellaError::Config(format!(
                    "Unknown provider: {other}. Supported: gemini, openai, ollama"
                )));
            }
        };
        Ok(provider)
    }

    /// Primary provider from config, wrapped with the Ollama fallback when enabled.
    pub fn from_config(config: &UmbrellaConfig) -> Result<Arc<dyn LlmProvider>> {
        let temperature = f64::from(config.llm_temperature);
        let primary = Self::create(
            &config.llm_provider,
            &config.llm_model,
            config.llm_api_key.as_deref(),
            config.llm_base_url.as_deref(),
            temperature,
            config.timeout,
        )?;

        if !config.llm_fallback_enabled || config.llm_provider == "ollama" {
            return Ok(primary);
        }

        Ok(Arc::new(LlmProviderWithFallback::new(
            primary,
            true,
            &config.llm_fallback_url,
            &config.llm_fallback_model,
            temperature,
        )))
    }
}


pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {

    #[must_use]
    pub fn from_config(config: &UmbrellaConfig) -> EmbeddingGenerator {
        let is_remote = config.embedding_provider != "ollama";
        let base_url = (is_remote && config.embedding_url != DEFAULT_OLLAMA_URL)
            .then(|| config.embedding_url.clone());

        EmbeddingGenerator::new(
            config.embedding_provider.clone(),
            if is_remote { DEFAULT_OLLAMA_URL.to_string() } else { config.embedding_url.clone() },
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            base_url,
            config.timeout,
            DEFAULT_CACHE_SIZE,
            DEFAULT_CACHE_TTL,
            config.embedding_fallback_enabled,
            Some(config.embedding_fallback_url.clone()),
            Some(config.embedding_fallback_model.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_provider() {
        let provider = LlmProviderFactory::create("ollama", "llama3.1:8b", None, None, 0.7, 30).unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "llama3.1:8b");
    }

    #[test]
    fn test_create_gemini_provider() {
        let provider =
            LlmProviderFactory::create("gemini", "gemini-1.5-flash", Some("test-key"), None, 0.3, 30)
                .unwrap();
        assert_eq!(provider.provider_name(), "gemini");
    }

    #[test]
    fn test_gemini_without_key_is_config_error() {
        let result = LlmProviderFactory::create("gemini", "gemini-1.5-flash", None, None, 0.3, 30);
        assert!(matches!(result, Err(UmbrellaError::Config(_))));
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let result = LlmProviderFactory::create("unknown", "model", None, None, 0.5, 30);
        match result {
            Err(UmbrellaError::Config(msg)) => assert!(msg.contains("Unknown provider")),
            _ => panic!("expected config error"),
        }
    }

    #[test]
    fn test_embedding_factory_uses_config_model() {
        let mut config = UmbrellaConfig::new();
        config.embedding_api_key = Some("key".to_string());
        let generator = EmbeddingProviderFactory::from_config(&config);
        assert_eq!(generator.provider(), "gemini");
        assert_eq!(generator.model(), "text-embedding-004");
    }

    #[test]
    fn test_fallback_wrapper_from_config() {
        let mut config = UmbrellaConfig::new();
        config.llm_api_key = Some("key".to_string());
        config.llm_fallback_enabled = true;
        let provider = LlmProviderFactory::from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "gemini");
    }
}
