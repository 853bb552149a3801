
use super::models::DecisionRecord;

/// The sentence that gets embedded for a stored decision.
pub fn embedding_text(record: &DecisionRecord) -> String {
    let location = non_empty_or(&record.location, "unknown location");
    let weather = non_empty_or(&record.weather_description, "unknown weather");
    let reason = non_empty_or(&record.reason, "no reason given");
    let rain = record
        .rain_probability
        .map(|p| format!("{}% rain probability", p))
        .unwrap_or_else(|| "an unknown rain probability".to_string());

    format!(
        "User {} decided {} for umbrella recommendation when weather in {} was {} at {}°C with {}. Reason: {}",
        record.user_id, record.recommendation, location, weather, record.temperature, rain, reason
    )
}

/// Synthetic query used to pull a user's decisions out of the index. It
/// shares the document sentence's opening so the two embed close together.
pub fn history_query(user_id: &str) -> String {
    format!("User {} umbrella decisions", user_id)
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}
