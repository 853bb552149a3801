use std::sync::Arc;
use tracing::{info, warn};

use super::engine::RecommendationEngine;
use super::models::{Decision, Observations};
use super::output::format_output;
use crate::memory::DecisionMemory;
use crate::weather::WeatherSource;

/// Runs one observe, decide, act cycle per request.
pub struct UmbrellaAgent {
    weather: Arc<dyn WeatherSource>,
    memory: Arc<DecisionMemory>,
    engine: RecommendationEngine,
    history_limit: usize,
}

impl UmbrellaAgent {

    pub fn new(
        weather: Arc<dyn WeatherSource>,
        memory: Arc<DecisionMemory>,
        engine: RecommendationEngine,
        history_limit: usize,
    ) -> Self {
        Self {
            weather,
            memory,
            engine,
            history_limit,
        }
    }

    pub fn memory(&self) -> &DecisionMemory {
        &self.memory
    }

    pub async fn run(&self, location: &str, user_id: &str) -> String {
        info!("Starting umbrella recommendation for {} in {}", user_id, location);

        let observations = self.observe(location, user_id).await;
        let decision = self.decide(&observations).await;
        self.act(&decision, user_id).await
    }

    /// Weather failures are recorded on the observations, not returned.
    pub async fn observe(&self, location: &str, user_id: &str) -> Observations {
        info!("OBSERVE: Gathering weather data and user history");

        let mut observations = Observations {
            location: location.to_string(),
            user_id: user_id.to_string(),
            ..Default::default()
        };

        match self.weather.get_weather(location).await {
            Ok(weather) => {
                info!(
                    "Weather: {}, {}% rain chance",
                    weather.description, weather.rain_probability
                );
                observations.weather = Some(weather);
            }
            Err(e) => {
                warn!("Error in observe phase: {}", e);
                observations.error = Some(e.to_string());
                return observations;
            }
        }

        observations.history = self.memory.get_history(user_id, self.history_limit).await;
        observations.stats = self.memory.get_stats(user_id).await;
        info!("User history: {} past decisions", observations.stats.total_decisions);

        observations
    }

    pub async fn decide(&self, observations: &Observations) -> Decision {
        info!("DECIDE: Analyzing data and making recommendation");
        self.engine.decide(observations).await
    }

    /// Stores the decision, then reports it against freshly computed stats.
    pub async fn act(&self, decision: &Decision, user_id: &str) -> String {
        info!("ACT: Storing decision and preparing output");

        self.memory.store(user_id, &decision.to_input()).await;
        let stats = self.memory.get_stats(user_id).await;

        format_output(decision, &stats)
    }
}
