use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use super::models::{Decision, Observations};
use super::prompt::{build_recommendation_prompt, SYSTEM_PROMPT};
use crate::llm::providers::LlmProvider;
use crate::memory::models::bounded_reason;
use crate::memory::Recommendation;
use crate::weather::WeatherSnapshot;

static YES_MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)\[YES\]").ok());
static NO_MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)\[NO\]").ok());
static ANY_MARKER: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)\[(?:YES|NO)\]").ok());

fn has_marker(marker: &LazyLock<Option<Regex>>, text: &str) -> bool {
    marker.as_ref().is_some_and(|re| re.is_match(text))
}

pub const DEFAULT_REASON: &str = "Based on current weather conditions.";

/// Confidence attached to every parsed model verdict.
pub const MODEL_CONFIDENCE: f64 = 0.8;

/// Without a marker, anything above this rain probability means YES.
pub const RAIN_THRESHOLD: f64 = 30.0;


pub struct RecommendationEngine {
    llm: Arc<dyn LlmProvider>,
}

impl RecommendationEngine {

    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        info!(
            "RecommendationEngine initialized: provider={}, model={}",
            llm.provider_name(),
            llm.model_name()
        );
        Self { llm }
    }

    /// Never fails: a missing observation or a provider error becomes a
    /// zero-confidence NO.
    pub async fn decide(&self, observations: &Observations) -> Decision {
        if let Some(error) = &observations.error {
            return Decision::failed(format!("Unable to get weather data: {}", error));
        }
        let Some(weather) = &observations.weather else {
            return Decision::failed("Unable to get weather data: no observations");
        };

        let prompt = build_recommendation_prompt(weather, &observations.history, &observations.stats);
        debug!("Prompt for {}: {}", observations.user_id, crate::safe_truncate(&prompt, 200));

        match self.llm.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(completion) => {
                if completion.fallback_used {
                    info!("Recommendation produced by fallback provider {}", completion.provider);
                }
                let decision = parse_response(&completion.text, Some(weather));
                info!("Recommendation: {}", decision.recommendation);
                info!("Reason: {}", decision.reason);
                decision
            }
            Err(e) => {
                warn!("LLM call failed: {}", e);
                Decision::failed(format!("Unable to process decision: {}", e))
            }
        }
    }
}

/// Reads the verdict out of free text. `[YES]` wins if both markers appear.
pub fn parse_response(response: &str, weather: Option<&WeatherSnapshot>) -> Decision {
    let response = response.trim();

    let recommendation = if has_marker(&YES_MARKER, response) {
        Recommendation::Yes
    } else if has_marker(&NO_MARKER, response) {
        Recommendation::No
    } else {
        let rain = weather.map(|w| w.rain_probability).unwrap_or_default();
        debug!("No verdict marker in response, falling back to rain probability {}", rain);
        if rain > RAIN_THRESHOLD { Recommendation::Yes } else { Recommendation::No }
    };

    let stripped = match ANY_MARKER.as_ref() {
        Some(re) => re.replace_all(response, "").into_owned(),
        None => response.to_string(),
    };
    let reason = bounded_reason(&stripped);
    let reason = if reason.is_empty() { DEFAULT_REASON.to_string() } else { reason };

    let decision = Decision {
        recommendation,
        reason,
        confidence: MODEL_CONFIDENCE,
        location: None,
        weather_description: None,
        rain_probability: None,
        temperature: None,
    };

    match weather {
        Some(weather) => decision.with_weather(weather),
        None => decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::providers::{Completion, LlmProviderError};
    use async_trait::async_trait;

    struct CannedProvider(Result<String, String>);

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<Completion, LlmProviderError> {
            match &self.0 {
                Ok(text) => Ok(Completion::new(text.clone(), "canned")),
                Err(e) => Err(LlmProviderError::Provider(e.clone())),
            }
        }

        fn provider_name(&self) -> &str {
            "canned"
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn weather(rain_probability: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            location: "London".to_string(),
            temperature: 14.0,
            humidity: 77.0,
            description: "light rain".to_string(),
            main: "Rain".to_string(),
            rain_probability,
        }
    }

    fn observations(rain_probability: f64) -> Observations {
        Observations {
            location: "London".to_string(),
            user_id: "alice".to_string(),
            weather: Some(weather(rain_probability)),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_markers() {
        let yes = parse_response("[YES] Light rain is expected all afternoon.", Some(&weather(10.0)));
        assert_eq!(yes.recommendation, Recommendation::Yes);
        assert_eq!(yes.reason, "Light rain is expected all afternoon.");
        assert_eq!(yes.confidence, 0.8);
        assert_eq!(yes.location.as_deref(), Some("London"));

        let no = parse_response("[no]\nSkies stay clear.", Some(&weather(90.0)));
        assert_eq!(no.recommendation, Recommendation::No);
        assert_eq!(no.reason, "Skies stay clear.");

        let both = parse_response("[NO] wait, [YES] actually", None);
        assert_eq!(both.recommendation, Recommendation::Yes);
    }

    #[test]
    fn test_parse_without_marker_uses_rain_threshold() {
        assert_eq!(parse_response("Probably fine.", Some(&weather(31.0))).recommendation, Recommendation::Yes);
        assert_eq!(parse_response("Probably fine.", Some(&weather(30.0))).recommendation, Recommendation::No);
        assert_eq!(parse_response("Probably fine.", None).recommendation, Recommendation::No);
    }

    #[test]
    fn test_parse_reason_bounds() {
        assert_eq!(parse_response("[YES]", None).reason, DEFAULT_REASON);
        assert_eq!(parse_response("   ", None).reason, DEFAULT_REASON);

        let long = format!("[YES] {}", "wet ".repeat(100));
        let reason = parse_response(&long, None).reason;
        assert_eq!(reason.chars().count(), 200);
        assert!(reason.ends_with("..."));
    }

    #[tokio::test]
    async fn test_decide_with_model_response() {
        let engine = RecommendationEngine::new(Arc::new(CannedProvider(Ok("[YES] Rain later.".to_string()))));
        let decision = engine.decide(&observations(75.0)).await;
        assert_eq!(decision.recommendation, Recommendation::Yes);
        assert_eq!(decision.rain_probability, Some(75.0));
        assert_eq!(decision.temperature, Some(14.0));
    }

    #[tokio::test]
    async fn test_decide_on_weather_error() {
        let engine = RecommendationEngine::new(Arc::new(CannedProvider(Ok("[YES]".to_string()))));
        let observations = Observations {
            error: Some("city not found".to_string()),
            ..Default::default()
        };
        let decision = engine.decide(&observations).await;
        assert_eq!(decision.recommendation, Recommendation::No);
        assert_eq!(decision.reason, "Unable to get weather data: city not found");
        assert_eq!(decision.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_decide_on_provider_error() {
        let engine = RecommendationEngine::new(Arc::new(CannedProvider(Err("quota exceeded".to_string()))));
        let decision = engine.decide(&observations(75.0)).await;
        assert_eq!(decision.recommendation, Recommendation::No);
        assert!(decision.reason.starts_with("Unable to process decision: "));
        assert!(decision.reason.contains("quota exceeded"));
        assert_eq!(decision.confidence, 0.0);
    }
}
