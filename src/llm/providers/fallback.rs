

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use super::base::{Completion, LlmProvider, LlmProviderError};
use super::ollama::OllamaProvider;

const FALLBACK_TIMEOUT_SECS: u64 = 120;

/// Wraps a primary provider and retries a failed call once on a local
/// Ollama model when enabled.
pub struct LlmProviderWithFallback {
    primary: Arc<dyn LlmProvider>,
    fallback: Option<OllamaProvider>,
    fallback_model: String,
    using_fallback: AtomicBool,
    primary_failures: AtomicUsize,
}

impl LlmProviderWithFallback {

    pub fn new(
        primary: Arc<dyn LlmProvider>,
        fallback_enabled: bool,
        fallback_url: &str,
        fallback_model: &str,
        temperature: f64,
    ) -> Self {
        let fallback = fallback_enabled
            .then(|| OllamaProvider::new(fallback_url, fallback_model, temperature, FALLBACK_TIMEOUT_SECS));

        info!(
            "LlmProviderWithFallback initialized: primary={}, fallback={}",
            primary.provider_name(),
            if fallback.is_some() { fallback_model } else { "disabled" }
        );

        Self {
            primary,
            fallback,
            fallback_model: fallback_model.to_string(),
            using_fallback: AtomicBool::new(false),
            primary_failures: AtomicUsize::new(0),
        }
    }


    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for LlmProviderWithFallback {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmProviderError> {
        let original_error = match self.primary.complete(system_prompt, user_prompt).await {
            Ok(completion) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                self.primary_failures.store(0, Ordering::SeqCst);
                return Ok(completion);
            }
            Err(e) => e,
        };

        let failures = self.primary_failures.fetch_add(1, Ordering::SeqCst) + 1;
        warn!("Primary LLM provider failed ({}x): {}", failures, original_error);

        let Some(fallback) = self.fallback.as_ref() else {
            return Err(original_error);
        };

        warn!(
            "Falling back to Ollama ({}) after {} failed: {}",
            self.fallback_model,
            self.primary.provider_name(),
            original_error
        );
        let mut completion = fallback.complete(system_prompt, user_prompt).await?;
        completion.fallback_used = true;

        self.using_fallback.store(true, Ordering::SeqCst);

        Ok(completion)
    }

    fn provider_name(&self) -> &str {
        if self.is_using_fallback() {
            "ollama (fallback)"
        } else {
            self.primary.provider_name()
        }
    }

    fn model_name(&self) -> &str {
        if self.is_using_fallback() {
            &self.fallback_model
        } else {
            self.primary.model_name()
        }
    }
}
