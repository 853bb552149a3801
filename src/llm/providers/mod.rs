

pub mod base;
pub mod fallback;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use base::{Completion, LlmProvider, LlmProviderError};
pub use fallback::LlmProviderWithFallback;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiCompatProvider;
