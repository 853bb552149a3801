use super::models::Decision;
use crate::memory::UserStats;

/// The final text shown to the user.
pub fn format_output(decision: &Decision, stats: &UserStats) -> String {
    let closing = if decision.recommendation.is_yes() {
        "🌂 Bring an umbrella!"
    } else {
        "☀️ No umbrella needed!"
    };

    format!(
        r#"🌦️  Umbrella Recommendation: [{verdict}]

📍 Location: {location}
🌡️  Weather: {weather} ({temperature}°C)
🌧️  Rain Probability: {rain}%

💭 Reason: {reason}

📊 Your History:
   - Total decisions: {total}
   - Usually take umbrella: {pct}% of time
   - Average rain probability: {avg}%

{closing}"#,
        verdict = decision.recommendation,
        location = decision.location.as_deref().unwrap_or("Unknown"),
        weather = decision.weather_description.as_deref().unwrap_or("Unknown"),
        temperature = decision.temperature.unwrap_or_default(),
        rain = decision.rain_probability.unwrap_or_default(),
        reason = decision.reason,
        total = stats.total_decisions,
        pct = stats.umbrella_percentage,
        avg = stats.average_rain_probability,
    )
}
