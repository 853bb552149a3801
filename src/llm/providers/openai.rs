use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::base::{Completion, LlmProvider, LlmProviderError};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<CompletionMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CompletionMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Any endpoint speaking the OpenAI chat-completions dialect
/// (OpenAI, Cerebras, Groq, a local vLLM).
pub struct OpenAiCompatProvider {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
    client: Client,
}

impl OpenAiCompatProvider {

    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<String>,
        temperature: f64,
        timeout_secs: u64,
    ) -> Self {
        let model = model.into();
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| OPENAI_API_URL.to_string());
        info!("OpenAI-compatible provider initialized (model={}, url={})", model, base_url);
        Self {
            api_key: api_key.into(),
            model,
            base_url,
            temperature,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmProviderError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                CompletionMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                CompletionMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(LlmProviderError::Http)?
            .json::<CompletionResponse>()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmProviderError::Provider("No choices in response".to_string()))?
            .message
            .content;

        if let Some(usage) = response.usage {
            debug!(
                "OpenAI-compatible endpoint answered ({} prompt + {} completion = {} tokens)",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        Ok(Completion::new(content, "openai"))
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
