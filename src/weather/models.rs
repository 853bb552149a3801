use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::WeatherError;

/// Current conditions for one location, as used by the prompt and the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub description: String,
    pub main: String,
    pub rain_probability: f64,
}

impl WeatherSnapshot {
    /// Reads an OpenWeatherMap current-weather payload.
    pub fn from_response(data: &Value) -> Result<Self, WeatherError> {
        let condition = data
            .get("weather")
            .and_then(|w| w.get(0))
            .ok_or_else(|| missing("weather[0]"))?;

        Ok(Self {
            location: str_field(data, "name")?,
            temperature: num_field(&data["main"], "temp")?,
            humidity: num_field(&data["main"], "humidity")?,
            description: str_field(condition, "description")?,
            main: str_field(condition, "main")?,
            rain_probability: estimate_rain_probability(data),
        })
    }
}

/// Rough rain chance in percent from the current condition alone; the
/// current-weather endpoint carries no forecast probability.
pub fn estimate_rain_probability(data: &Value) -> f64 {
    if data.get("rain").is_some() {
        return 80.0;
    }

    let condition = &data["weather"][0];
    let main = condition["main"].as_str().unwrap_or_default().to_lowercase();
    let description = condition["description"].as_str().unwrap_or_default().to_lowercase();
    let mentions = |word: &str| main.contains(word) || description.contains(word);

    if mentions("rain") {
        75.0
    } else if mentions("drizzle") {
        60.0
    } else if main.contains("thunderstorm") || description.contains("storm") {
        85.0
    } else if main.contains("clouds") {
        if description.contains("overcast") || description.contains("broken") {
            40.0
        } else {
            25.0
        }
    } else if main.contains("clear") || description.contains("sunny") {
        5.0
    } else {
        30.0
    }
}

fn missing(field: &str) -> WeatherError {
    WeatherError::Parse(format!("missing field '{}'", field))
}

fn str_field(value: &Value, field: &str) -> Result<String, WeatherError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing(field))
}

fn num_field(value: &Value, field: &str) -> Result<f64, WeatherError> {
    value.get(field).and_then(Value::as_f64).ok_or_else(|| missing(field))
}
