pub mod engine;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod prompt;

pub use engine::{parse_response, RecommendationEngine};
pub use models::{Decision, Observations};
pub use orchestrator::UmbrellaAgent;
pub use output::format_output;
