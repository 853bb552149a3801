pub mod agent;
pub mod core;
pub mod db;
pub mod llm;
pub mod memory;
pub mod utils;
pub mod weather;

pub use utils::{safe_truncate, safe_truncate_ellipsis};


pub use agent::{RecommendationEngine, UmbrellaAgent};
pub use crate::core::config::UmbrellaConfig;
pub use crate::core::error::{Result, UmbrellaError};
pub use db::{HelixClient, HelixClientError};
pub use llm::embeddings::EmbeddingGenerator;
pub use memory::{DecisionMemory, DEFAULT_HISTORY_LIMIT, STATS_HISTORY_LIMIT};
pub use weather::{WeatherService, WeatherSource};


pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";


pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";


pub const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";


pub const DEFAULT_HELIX_PORT: u16 = 6969;


pub const DEFAULT_CACHE_SIZE: usize = 1000;


pub const DEFAULT_CACHE_TTL: u64 = 300;


pub const DEFAULT_WEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";


pub const DEFAULT_PERSIST_DIR: &str = "./umbrella_db";

/// The one shared collection every user's decisions live in.
pub const DEFAULT_COLLECTION: &str = "umbrella_decisions";
