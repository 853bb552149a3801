use crate::memory::{HistoryEntry, UserStats};
use crate::weather::WeatherSnapshot;

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that provides umbrella recommendations based on weather data and user history. Always respond with a clear YES or NO recommendation followed by a brief reason.";

/// Past decisions quoted in the prompt.
pub const PROMPT_HISTORY_ITEMS: usize = 3;


pub fn build_recommendation_prompt(weather: &WeatherSnapshot, history: &[HistoryEntry], stats: &UserStats) -> String {
    let mut prompt = format!(
        r#"Weather Analysis for Umbrella Recommendation:

Location: {location}
Current Weather: {description}
Temperature: {temperature}°C
Rain Probability: {rain}%
Humidity: {humidity}%

"#,
        location = weather.location,
        description = weather.description,
        temperature = weather.temperature,
        rain = weather.rain_probability,
        humidity = weather.humidity,
    );

    if stats.is_first_time() {
        prompt.push_str("User History: No previous decisions (first time user)\n");
    } else {
        prompt.push_str(&format!(
            r#"User History:
- Total past decisions: {total}
- Usually takes umbrella: {pct}% of the time
- Average rain probability in past decisions: {avg}%

Recent decisions:
"#,
            total = stats.total_decisions,
            pct = stats.umbrella_percentage,
            avg = stats.average_rain_probability,
        ));
        for entry in history.iter().take(PROMPT_HISTORY_ITEMS) {
            let rain = entry
                .rain_probability
                .map(|p| format!("{}%", p))
                .unwrap_or_else(|| "unknown".to_string());
            let weather = if entry.weather_description.is_empty() {
                "unknown"
            } else {
                entry.weather_description.as_str()
            };
            prompt.push_str(&format!("- {} when rain was {} ({})\n", entry.recommendation, rain, weather));
        }
    }

    prompt.push_str(
        r#"
Based on the weather conditions and user history, should this user bring an umbrella?

Respond with:
1. [YES] or [NO]
2. Brief reason (one sentence)

Consider:
- Rain probability > 30% generally suggests umbrella
- User's past patterns and preferences
- Current weather conditions
"#,
    );

    prompt
}
