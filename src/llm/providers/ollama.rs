use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::base::{Completion, LlmProvider, LlmProviderError};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

/// Local model served by Ollama's `/api/chat`. Also the fallback target.
pub struct OllamaProvider {
    base_url: String,
    model: String,
    temperature: f64,
    client: Client,
}

impl OllamaProvider {

    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        timeout_secs: u64,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        info!("Ollama provider initialized (model={}, url={})", model, base_url);
        Self {
            base_url,
            model,
            temperature,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::new("system", system_prompt),
                ChatMessage::new("user", user_prompt),
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(LlmProviderError::Http)?
            .json::<ChatResponse>()
            .await?;

        debug!(
            "Ollama answered ({} prompt + {} completion tokens)",
            response.prompt_eval_count, response.eval_count
        );

        Ok(Completion::new(response.message.content, "ollama"))
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parsing_defaults_counts() {
        let raw = r#"{"message": {"role": "assistant", "content": "[NO] Clear skies."}}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.message.content, "[NO] Clear skies.");
        assert_eq!(response.prompt_eval_count, 0);
        assert_eq!(response.eval_count, 0);
    }

    #[test]
    fn test_request_is_non_streaming_plain_text() {
        let request = ChatRequest {
            model: "llama3.2",
            messages: vec![ChatMessage::new("user", "hi")],
            stream: false,
            options: ChatOptions { temperature: 0.3 },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("format").is_none());
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.3);
    }

    #[test]
    fn test_provider_names_and_trimmed_url() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3.2", 0.3, 30);
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "llama3.2");
        assert_eq!(provider.base_url, "http://localhost:11434");
    }
}
