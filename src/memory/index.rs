

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use super::models::DecisionMetadata;


#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Index unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate record id: {0}")]
    DuplicateId(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<crate::db::HelixClientError> for IndexError {
    fn from(e: crate::db::HelixClientError) -> Self {
        IndexError::Query(e.to_string())
    }
}


/// Exact-match metadata filter applied alongside similarity ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFilter {
    pub user_id: String,
}

impl IndexFilter {

    pub fn user(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }

    pub fn matches(&self, metadata: &DecisionMetadata) -> bool {
        metadata.user_id == self.user_id
    }
}


/// The unit of insertion: vector, document, metadata and id travel together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDecision {
    pub id: String,
    pub document: String,
    pub metadata: DecisionMetadata,
    #[serde(default)]
    pub vector: Vec<f32>,
}


#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub document: String,
    pub metadata: DecisionMetadata,
    pub score: f64,
}

/// A collection that supports vector similarity combined with an exact
/// metadata filter. Insert-only: there is no update or delete.
#[async_trait]
pub trait SemanticIndex: Send + Sync {

    async fn insert(&self, entry: IndexedDecision) -> Result<(), IndexError>;

    /// Up to `k` entries matching `filter`, best cosine score first.
    async fn search(&self, query: &[f32], filter: &IndexFilter, k: usize) -> Result<Vec<SearchHit>, IndexError>;

    /// Every entry matching `filter`, in no particular order.
    async fn scan(&self, filter: &IndexFilter) -> Result<Vec<IndexedDecision>, IndexError>;

    fn name(&self) -> &str;
}


pub fn cosine_similarity(vec1: &[f32], vec2: &[f32]) -> f64 {
    if vec1.len() != vec2.len() || vec1.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = vec1.iter().zip(vec2.iter()).map(|(a, b)| a * b).sum();
    let mag1: f32 = vec1.iter().map(|a| a * a).sum::<f32>().sqrt();
    let mag2: f32 = vec2.iter().map(|b| b * b).sum::<f32>().sqrt();

    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }

    f64::from(dot_product / (mag1 * mag2))
}


pub fn rank_by_similarity<'a>(
    query: &[f32],
    entries: impl IntoIterator<Item = &'a IndexedDecision>,
    filter: &IndexFilter,
    k: usize,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = entries
        .into_iter()
        .filter(|e| filter.matches(&e.metadata))
        .map(|e| SearchHit {
            id: e.id.clone(),
            document: e.document.clone(),
            metadata: e.metadata.clone(),
            score: cosine_similarity(query, &e.vector),
        })
        .collect();

    sort_hits(&mut hits);
    hits.truncate(k);
    hits
}

/// Descending score; ties fall back to id so results are deterministic.
pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}
