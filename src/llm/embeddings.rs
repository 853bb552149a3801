

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::cache::{CacheStats, EmbeddingCache};

const DEFAULT_FALLBACK_URL: &str = "http://localhost:11434";
const DEFAULT_FALLBACK_MODEL: &str = "nomic-embed-text";
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_API_URL: &str = "https://api.openai.com/v1";


#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Empty text")]
    EmptyText,

    #[error("Provider not implemented: {0}")]
    NotImplemented(String),

    #[error("Both primary and fallback failed: primary={0}, fallback={1}")]
    BothFailed(String, String),
}

/// Anything that turns text into a vector for the semantic index.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn model_name(&self) -> &str;
}


#[derive(Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GeminiEmbeddingRequest {
    model: String,
    content: GeminiEmbeddingContent,
}

#[derive(Serialize)]
struct GeminiEmbeddingContent {
    parts: Vec<GeminiEmbeddingPart>,
}

#[derive(Serialize)]
struct GeminiEmbeddingPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiEmbeddingResponse {
    embedding: GeminiEmbeddingValues,
}

#[derive(Deserialize)]
struct GeminiEmbeddingValues {
    values: Vec<f32>,
}


pub struct EmbeddingGenerator {
    provider: String,
    ollama_url: String,
    model: String,
    api_key: Option<String>,
    base_url: Option<String>,
    client: Client,
    cache: EmbeddingCache,


    fallback_enabled: bool,
    fallback_url: String,
    fallback_model: String,
    using_fallback: AtomicBool,
    fallback_count: AtomicUsize,
}

impl EmbeddingGenerator {

    pub fn new(
        provider: impl Into<String>,
        ollama_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        base_url: Option<String>,
        timeout_secs: u64,
        cache_size: usize,
        cache_ttl: u64,
        fallback_enabled: bool,
        fallback_url: Option<String>,
        fallback_model: Option<String>,
    ) -> Self {
        let provider = provider.into().to_lowercase();
        let model = model.into();
        let ollama_url = ollama_url.into();
        let fallback_url = fallback_url.unwrap_or_else(|| DEFAULT_FALLBACK_URL.to_string());
        let fallback_model = fallback_model.unwrap_or_else(|| DEFAULT_FALLBACK_MODEL.to_string());

        info!(
            "EmbeddingGenerator initialized: provider={}, model={}, cache={}",
            provider, model, cache_size
        );

        Self {
            provider,
            ollama_url,
            model,
            api_key,
            base_url,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            cache: EmbeddingCache::new(cache_size, cache_ttl),
            fallback_enabled,
            fallback_url,
            fallback_model,
            using_fallback: AtomicBool::new(false),
            fallback_count: AtomicUsize::new(0),
        }
    }


    pub async fn generate(&self, text: &str, use_cache: bool) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let key = EmbeddingCache::make_key(&self.model, text);
        if use_cache {
            if let Some(cached) = self.cache.get(&key) {
                debug!("Cache HIT for: {}...", crate::safe_truncate(text, 50));
                return Ok(cached);
            }
        }

        let result = match self.provider.as_str() {
            "gemini" => self.generate_gemini(text).await,
            "ollama" => self.generate_ollama(text).await,
            "openai" => self.generate_openai(text).await,
            other => Err(EmbeddingError::NotImplemented(other.to_string())),
        };

        match result {
            Ok(embedding) => {
                if use_cache {
                    self.cache.set(&key, embedding.clone());
                }
                self.using_fallback.store(false, Ordering::SeqCst);
                Ok(embedding)
            }
            Err(e) => {
                debug!("Primary embedding provider unavailable: {}", e);
                if self.fallback_enabled && self.provider != "ollama" {
                    self.fallback_to_ollama(text, use_cache, &e).await
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn generate_gemini(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let api_url = self
            .base_url
            .as_ref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| GEMINI_API_URL.to_string());

        let model = self.model.trim_start_matches("models/");
        let request = GeminiEmbeddingRequest {
            model: format!("models/{}", model),
            content: GeminiEmbeddingContent {
                parts: vec![GeminiEmbeddingPart {
                    text: text.to_string(),
                }],
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}:embedContent", api_url, model))
            .query(&[("key", api_key.as_str())])
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<GeminiEmbeddingResponse>()
            .await?;

        if response.embedding.values.is_empty() {
            return Err(EmbeddingError::InvalidResponse("Empty embedding in response".to_string()));
        }
        Ok(response.embedding.values)
    }

    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.ollama_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OllamaEmbeddingResponse>()
            .await?;

        Ok(response.embedding)
    }

    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::InvalidResponse("API key required".to_string()))?;

        let api_url = self
            .base_url
            .as_ref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| OPENAI_API_URL.to_string());

        let request = OpenAIEmbeddingRequest {
            model: self.model.clone(),
            input: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", api_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        response
            .data
            .first()
            .map(|d| d.embedding.clone())
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }

    async fn fallback_to_ollama(
        &self,
        text: &str,
        use_cache: bool,
        original_error: &EmbeddingError,
    ) -> Result<Vec<f32>, EmbeddingError> {
        info!(
            "Using fallback Ollama ({}/{}) - primary unavailable",
            self.fallback_url, self.fallback_model
        );

        let request = OllamaEmbeddingRequest {
            model: self.fallback_model.clone(),
            prompt: text.to_string(),
        };

        let both_failed = |e: reqwest::Error| EmbeddingError::BothFailed(original_error.to_string(), e.to_string());

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.fallback_url))
            .json(&request)
            .send()
            .await
            .map_err(both_failed)?
            .error_for_status()
            .map_err(both_failed)?
            .json::<OllamaEmbeddingResponse>()
            .await
            .map_err(both_failed)?;

        let embedding = response.embedding;

        if use_cache {
            // Fallback vectors live in a different space; key them by the fallback model.
            self.cache
                .set(&EmbeddingCache::make_key(&self.fallback_model, text), embedding.clone());
        }

        self.using_fallback.store(true, Ordering::SeqCst);
        self.fallback_count.fetch_add(1, Ordering::SeqCst);

        info!(
            "Fallback successful! dims={}, total_fallbacks={}",
            embedding.len(),
            self.fallback_count.load(Ordering::SeqCst)
        );

        Ok(embedding)
    }


    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }


    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }


    pub fn model(&self) -> &str {
        &self.model
    }


    pub fn provider(&self) -> &str {
        &self.provider
    }
}

#[async_trait]
impl Embedder for EmbeddingGenerator {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.generate(text, true).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(provider: &str) -> EmbeddingGenerator {
        EmbeddingGenerator::new(
            provider,
            "http://127.0.0.1:9",
            "text-embedding-004",
            None,
            None,
            1,
            8,
            60,
            false,
            None,
            None,
        )
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected() {
        let result = generator("gemini").generate("   ", true).await;
        assert!(matches!(result, Err(EmbeddingError::EmptyText)));
    }

    #[tokio::test]
    async fn test_unknown_provider() {
        let result = generator("chroma").generate("rain", false).await;
        assert!(matches!(result, Err(EmbeddingError::NotImplemented(p)) if p == "chroma"));
    }

    #[tokio::test]
    async fn test_gemini_requires_api_key() {
        let result = generator("gemini").generate("rain", false).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidResponse(_))));
    }

    #[test]
    fn test_provider_is_lowercased() {
        let generator = generator("Gemini");
        assert_eq!(generator.provider(), "gemini");
        assert_eq!(generator.model(), "text-embedding-004");
        assert_eq!(generator.cache_stats().size, 0);
        assert!(!generator.is_using_fallback());
    }
}
