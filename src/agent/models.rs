use serde::{Deserialize, Serialize};

use crate::memory::{DecisionInput, HistoryEntry, Recommendation, UserStats};
use crate::weather::WeatherSnapshot;

/// Everything gathered before the model is asked.
#[derive(Debug, Clone, Default)]
pub struct Observations {
    pub location: String,
    pub user_id: String,
    pub weather: Option<WeatherSnapshot>,
    pub history: Vec<HistoryEntry>,
    pub stats: UserStats,
    /// Set when the weather lookup failed; the decision then short-circuits.
    pub error: Option<String>,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub recommendation: Recommendation,
    pub reason: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl Decision {
    /// A conservative NO with zero confidence and no weather context.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            recommendation: Recommendation::No,
            reason: reason.into(),
            confidence: 0.0,
            location: None,
            weather_description: None,
            rain_probability: None,
            temperature: None,
        }
    }

    pub fn with_weather(mut self, weather: &WeatherSnapshot) -> Self {
        self.location = Some(weather.location.clone());
        self.weather_description = Some(weather.description.clone());
        self.rain_probability = Some(weather.rain_probability);
        self.temperature = Some(weather.temperature);
        self
    }

    pub fn to_input(&self) -> DecisionInput {
        DecisionInput {
            recommendation: self.recommendation,
            reason: Some(self.reason.clone()),
            location: self.location.clone(),
            weather_description: self.weather_description.clone(),
            rain_probability: self.rain_probability,
            temperature: self.temperature,
            confidence: Some(self.confidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_decision_converts_without_context() {
        let input = Decision::failed("Unable to get weather data: timeout").to_input();
        assert_eq!(input.recommendation, Recommendation::No);
        assert_eq!(input.confidence, Some(0.0));
        assert!(input.location.is_none());
        assert!(input.rain_probability.is_none());
    }
}
