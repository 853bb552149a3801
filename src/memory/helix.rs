use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::HelixClient;
use super::index::{
    cosine_similarity, sort_hits, IndexError, IndexFilter, IndexedDecision, SearchHit, SemanticIndex,
};
use super::models::{DecisionMetadata, Recommendation};

/// Vector search results are filtered again on the client, so over-fetch to
/// keep `k` results after dropping other users' records.
const SEARCH_OVERFETCH: usize = 4;

#[derive(Serialize)]
struct AddDecisionInput<'a> {
    collection: &'a str,
    record_id: &'a str,
    user_id: &'a str,
    document: &'a str,
    decision: &'static str,
    reason: &'a str,
    location: &'a str,
    weather_description: &'a str,
    has_rain_probability: bool,
    rain_probability: f64,
    temperature: f64,
    timestamp: &'a str,
    vector_data: &'a [f32],
}

#[derive(Serialize)]
struct SearchDecisionsInput<'a> {
    collection: &'a str,
    user_id: &'a str,
    query_vector: &'a [f32],
    limit: usize,
}

#[derive(Serialize)]
struct DecisionsByUserInput<'a> {
    collection: &'a str,
    user_id: &'a str,
}

#[derive(Deserialize)]
struct DecisionsOutput {
    #[serde(default)]
    decisions: Vec<DecisionNode>,
}

#[derive(Deserialize)]
struct DecisionNode {
    record_id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    document: String,
    #[serde(default)]
    decision: String,
    #[serde(default)]
    reason: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    weather_description: String,
    #[serde(default)]
    has_rain_probability: Option<bool>,
    #[serde(default)]
    rain_probability: Option<f64>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    vector_data: Vec<f32>,
}

impl DecisionNode {
    fn metadata(&self) -> DecisionMetadata {
        // HelixQL properties are not nullable; the flag records whether the
        // value was ever present.
        let rain_probability = match self.has_rain_probability {
            Some(false) => None,
            _ => self.rain_probability,
        };

        DecisionMetadata {
            user_id: self.user_id.clone(),
            decision: Recommendation::parse_lenient(&self.decision),
            reason: self.reason.clone(),
            location: self.location.clone(),
            weather_description: self.weather_description.clone(),
            rain_probability,
            temperature: self.temperature,
            timestamp: self.timestamp.clone(),
        }
    }
}

/// HelixDB-backed collection. Expects `schema/schema.hx` and the
/// `addDecision`, `searchDecisions` and `getDecisionsByUser` queries from
/// `schema/queries.hx` to be deployed.
pub struct HelixIndex {
    client: HelixClient,
    collection: String,
}

impl HelixIndex {

    pub fn new(client: HelixClient, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        info!("HelixIndex initialized ({} @ {})", collection, client.base_url());
        Self { client, collection }
    }
}

#[async_trait]
impl SemanticIndex for HelixIndex {
    async fn insert(&self, entry: IndexedDecision) -> Result<(), IndexError> {
        let metadata = &entry.metadata;
        let input = AddDecisionInput {
            collection: &self.collection,
            record_id: &entry.id,
            user_id: &metadata.user_id,
            document: &entry.document,
            decision: metadata.decision.as_str(),
            reason: &metadata.reason,
            location: &metadata.location,
            weather_description: &metadata.weather_description,
            has_rain_probability: metadata.rain_probability.is_some(),
            rain_probability: metadata.rain_probability.unwrap_or_default(),
            temperature: metadata.temperature.unwrap_or_default(),
            timestamp: &metadata.timestamp,
            vector_data: &entry.vector,
        };

        self.client
            .execute_query::<serde_json::Value, _>("addDecision", &input)
            .await?;
        debug!("HelixIndex inserted {}", entry.id);
        Ok(())
    }

    async fn search(&self, query: &[f32], filter: &IndexFilter, k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let input = SearchDecisionsInput {
            collection: &self.collection,
            user_id: &filter.user_id,
            query_vector: query,
            limit: k.saturating_mul(SEARCH_OVERFETCH),
        };

        let output: DecisionsOutput = self.client.execute_query("searchDecisions", &input).await?;

        let mut hits: Vec<SearchHit> = output
            .decisions
            .into_iter()
            .filter_map(|node| {
                let metadata = node.metadata();
                if !filter.matches(&metadata) {
                    warn!("Dropping record {} returned for another user", node.record_id);
                    return None;
                }
                let score = node
                    .score
                    .unwrap_or_else(|| cosine_similarity(query, &node.vector_data));
                Some(SearchHit {
                    id: node.record_id,
                    document: node.document,
                    metadata,
                    score,
                })
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn scan(&self, filter: &IndexFilter) -> Result<Vec<IndexedDecision>, IndexError> {
        let input = DecisionsByUserInput {
            collection: &self.collection,
            user_id: &filter.user_id,
        };

        let output: DecisionsOutput = self.client.execute_query("getDecisionsByUser", &input).await?;

        Ok(output
            .decisions
            .into_iter()
            .filter_map(|node| {
                let metadata = node.metadata();
                filter.matches(&metadata).then(|| IndexedDecision {
                    id: node.record_id,
                    document: node.document,
                    metadata,
                    vector: node.vector_data,
                })
            })
            .collect())
    }

    fn name(&self) -> &str {
        "helix"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_metadata_respects_presence_flag() {
        let node: DecisionNode = serde_json::from_str(
            r#"{"record_id": "bob_1", "user_id": "bob", "decision": "NO",
                "has_rain_probability": false, "rain_probability": 0.0, "temperature": 18.0}"#,
        )
        .unwrap();
        let metadata = node.metadata();
        assert_eq!(metadata.decision, Recommendation::No);
        assert!(metadata.rain_probability.is_none());
        assert_eq!(metadata.temperature, Some(18.0));
    }

    #[test]
    fn test_node_metadata_without_flag_keeps_value() {
        let node: DecisionNode =
            serde_json::from_str(r#"{"record_id": "bob_2", "user_id": "bob", "decision": "yes", "rain_probability": 40.0}"#)
                .unwrap();
        let metadata = node.metadata();
        assert_eq!(metadata.decision, Recommendation::Yes);
        assert_eq!(metadata.rain_probability, Some(40.0));
    }

    #[test]
    fn test_output_tolerates_missing_list() {
        let output: DecisionsOutput = serde_json::from_str("{}").unwrap();
        assert!(output.decisions.is_empty());
    }

    const SCHEMA: &str = include_str!("../../schema/schema.hx");
    const QUERIES: &str = include_str!("../../schema/queries.hx");

    fn query_params(name: &str) -> &'static str {
        let start = QUERIES.find(&format!("QUERY {name}(")).unwrap();
        let rest = &QUERIES[start..];
        &rest[..rest.find(") =>").unwrap()]
    }

    fn field_names(value: serde_json::Value) -> Vec<String> {
        value.as_object().unwrap().keys().cloned().collect()
    }

    #[test]
    fn test_deployed_queries_match_client_inputs() {
        let add = AddDecisionInput {
            collection: "umbrella_decisions",
            record_id: "alice_1",
            user_id: "alice",
            document: "doc",
            decision: "YES",
            reason: "rain",
            location: "London",
            weather_description: "light rain",
            has_rain_probability: true,
            rain_probability: 80.0,
            temperature: 14.0,
            timestamp: "2024-01-01T00:00:00",
            vector_data: &[0.1, 0.2],
        };
        let search = SearchDecisionsInput {
            collection: "umbrella_decisions",
            user_id: "alice",
            query_vector: &[0.1, 0.2],
            limit: 20,
        };
        let by_user = DecisionsByUserInput {
            collection: "umbrella_decisions",
            user_id: "alice",
        };

        for (query, input) in [
            ("addDecision", serde_json::to_value(&add).unwrap()),
            ("searchDecisions", serde_json::to_value(&search).unwrap()),
            ("getDecisionsByUser", serde_json::to_value(&by_user).unwrap()),
        ] {
            let params = query_params(query);
            for field in field_names(input) {
                assert!(params.contains(&format!("{field}:")), "{query} is missing {field}");
            }
        }
    }

    #[test]
    fn test_schema_stores_every_node_field() {
        let node = schema_block("N::Decision");
        for field in [
            "record_id", "user_id", "document", "decision", "reason", "location",
            "weather_description", "has_rain_probability", "rain_probability",
            "temperature", "timestamp", "vector_data",
        ] {
            assert!(node.contains(&format!("{field}:")), "Decision node is missing {field}");
        }
        assert!(QUERIES.matches("RETURN decisions").count() >= 2);
    }

    fn schema_block(header: &str) -> &'static str {
        let start = SCHEMA.find(header).unwrap();
        let rest = &SCHEMA[start..];
        &rest[..rest.find('}').unwrap()]
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let index = HelixIndex::new(HelixClient::new("127.0.0.1", 9), "umbrella_decisions");
        let result = index.scan(&IndexFilter::user("alice")).await;
        assert!(result.is_err());
    }
}
