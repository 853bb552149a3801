use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::{WeatherError, WeatherSnapshot};
use crate::core::UmbrellaConfig;

/// Anything that can report current conditions for a location.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn get_weather(&self, location: &str) -> Result<WeatherSnapshot, WeatherError>;
}

/// OpenWeatherMap current-weather client.
pub struct WeatherService {
    api_key: String,
    base_url: String,
    client: Client,
}

impl WeatherService {

    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let base_url = base_url.into();
        info!("WeatherService initialized ({})", base_url);
        Self {
            api_key: api_key.into(),
            base_url,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn from_config(config: &UmbrellaConfig) -> Result<Self, WeatherError> {
        let api_key = config
            .weather_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| WeatherError::Config("OPENWEATHER_API_KEY not found in environment variables".to_string()))?;
        Ok(Self::new(api_key, config.weather_base_url.clone(), config.timeout))
    }
}

#[async_trait]
impl WeatherSource for WeatherService {
    async fn get_weather(&self, location: &str) -> Result<WeatherSnapshot, WeatherError> {
        debug!("Fetching weather for {}", location);

        let data: Value = self
            .client
            .get(&self.base_url)
            .query(&[("q", location), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        WeatherSnapshot::from_response(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_key() {
        let mut config = UmbrellaConfig::new();
        assert!(matches!(WeatherService::from_config(&config), Err(WeatherError::Config(_))));

        config.weather_api_key = Some(String::new());
        assert!(WeatherService::from_config(&config).is_err());

        config.weather_api_key = Some("owm-key".to_string());
        assert!(WeatherService::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let service = WeatherService::new("key", "http://127.0.0.1:9/data/2.5/weather", 2);
        assert!(matches!(service.get_weather("London").await, Err(WeatherError::Http(_))));
    }
}
