

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString, IntoStaticStr};

/// Stored reasons never exceed this many chars, ellipsis included.
pub const MAX_REASON_CHARS: usize = 200;

pub fn bounded_reason(reason: &str) -> String {
    let reason = reason.trim();
    if reason.chars().count() > MAX_REASON_CHARS {
        crate::safe_truncate_ellipsis(reason, MAX_REASON_CHARS - 3)
    } else {
        reason.to_string()
    }
}


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumString, IntoStaticStr, Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Recommendation {

    Yes,

    No,

    #[default]
    #[serde(other)]
    Unknown,
}

impl Recommendation {
    /// Case-insensitive; anything unrecognized is `Unknown`.
    pub fn parse_lenient(s: &str) -> Self {
        Self::from_str(s.trim()).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Self::Yes)
    }
}


/// What the recommendation engine hands to the store. Only the verdict is
/// required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionInput {
    pub recommendation: Recommendation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl DecisionInput {

    pub fn new(recommendation: Recommendation) -> Self {
        Self {
            recommendation,
            ..Default::default()
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_weather(mut self, description: impl Into<String>) -> Self {
        self.weather_description = Some(description.into());
        self
    }

    pub fn with_rain_probability(mut self, rain_probability: f64) -> Self {
        self.rain_probability = Some(rain_probability);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}


/// Metadata map persisted next to each document. Every field tolerates
/// absence so partially written or older records still read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetadata {
    pub user_id: String,
    #[serde(default)]
    pub decision: Recommendation,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub weather_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rain_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub timestamp: String,
}


/// One persisted recommendation event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub record_id: String,
    pub user_id: String,
    pub recommendation: Recommendation,
    pub reason: String,
    pub location: String,
    pub weather_description: String,
    pub rain_probability: Option<f64>,
    pub temperature: f64,
    pub created_at: DateTime<Utc>,
    pub embedding_text: String,
}

impl DecisionRecord {

    pub fn metadata(&self) -> DecisionMetadata {
        DecisionMetadata {
            user_id: self.user_id.clone(),
            decision: self.recommendation,
            reason: self.reason.clone(),
            location: self.location.clone(),
            weather_description: self.weather_description.clone(),
            rain_probability: self.rain_probability,
            temperature: Some(self.temperature),
            timestamp: self.created_at.to_rfc3339(),
        }
    }
}


/// Read-side view of a stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record_id: String,
    pub content: String,
    pub recommendation: Recommendation,
    pub reason: String,
    pub location: String,
    pub weather_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl HistoryEntry {

    pub fn from_parts(record_id: String, content: String, metadata: DecisionMetadata, score: Option<f64>) -> Self {
        let created_at = DateTime::parse_from_rfc3339(&metadata.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc));

        Self {
            record_id,
            content,
            recommendation: metadata.decision,
            reason: metadata.reason,
            location: metadata.location,
            weather_description: metadata.weather_description,
            rain_probability: metadata.rain_probability,
            temperature: metadata.temperature,
            created_at,
            score,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub total_decisions: usize,
    pub umbrella_decisions: usize,
    pub no_umbrella_decisions: usize,
    pub umbrella_percentage: f64,
    pub average_rain_probability: f64,
}

impl UserStats {

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_first_time(&self) -> bool {
        self.total_decisions == 0
    }
}
