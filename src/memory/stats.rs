use super::models::{HistoryEntry, Recommendation, UserStats};
use crate::utils::round1;

/// Aggregates whatever history was retrieved. Records without a rain
/// probability are left out of that average entirely.
pub fn aggregate(history: &[HistoryEntry]) -> UserStats {
    if history.is_empty() {
        return UserStats::zero();
    }

    let total_decisions = history.len();
    let umbrella_decisions = history
        .iter()
        .filter(|h| h.recommendation == Recommendation::Yes)
        .count();
    let no_umbrella_decisions = history
        .iter()
        .filter(|h| h.recommendation == Recommendation::No)
        .count();

    let rain: Vec<f64> = history.iter().filter_map(|h| h.rain_probability).collect();
    let average_rain_probability = if rain.is_empty() {
        0.0
    } else {
        rain.iter().sum::<f64>() / rain.len() as f64
    };

    UserStats {
        total_decisions,
        umbrella_decisions,
        no_umbrella_decisions,
        umbrella_percentage: round1(100.0 * umbrella_decisions as f64 / total_decisions as f64),
        average_rain_probability: round1(average_rain_probability),
    }
}
