use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::content::{embedding_text, history_query};
use super::ids;
use super::index::{IndexError, IndexFilter, IndexedDecision, SemanticIndex};
use super::models::{bounded_reason, DecisionInput, DecisionRecord, HistoryEntry, UserStats};
use super::stats::aggregate;
use crate::llm::embeddings::{Embedder, EmbeddingError};

/// History size handed to the prompt when the caller has no preference.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Stats are computed over at most this many similarity-ranked records.
pub const STATS_HISTORY_LIMIT: usize = 100;


#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index failed: {0}")]
    Index(#[from] IndexError),
}


/// Per-user decision memory over one shared semantic index.
///
/// Every operation comes in two forms. The `try_` forms return the failure;
/// the plain forms log it and fall back to a no-op, an empty history or
/// zero stats, so a broken store looks exactly like a first-time user.
///
/// `get_history` is relevance-ranked against a synthetic query, not
/// chronological. `get_recent_history` is the strictly time-ordered
/// alternative.
pub struct DecisionMemory {
    index: Arc<dyn SemanticIndex>,
    embedder: Arc<dyn Embedder>,
}

impl DecisionMemory {

    pub fn new(index: Arc<dyn SemanticIndex>, embedder: Arc<dyn Embedder>) -> Self {
        info!(
            "DecisionMemory initialized (index={}, embedder={})",
            index.name(),
            embedder.model_name()
        );
        Self { index, embedder }
    }

    pub async fn try_store(&self, user_id: &str, decision: &DecisionInput) -> Result<DecisionRecord, MemoryError> {
        validate_user(user_id)?;

        let created_at = ids::next_timestamp();
        let mut record = DecisionRecord {
            record_id: ids::record_id(user_id, &created_at),
            user_id: user_id.to_string(),
            recommendation: decision.recommendation,
            reason: bounded_reason(decision.reason.as_deref().unwrap_or_default()),
            location: decision.location.clone().unwrap_or_default(),
            weather_description: decision.weather_description.clone().unwrap_or_default(),
            rain_probability: decision
                .rain_probability
                .filter(|p| p.is_finite())
                .map(|p| p.clamp(0.0, 100.0)),
            temperature: decision.temperature.filter(|t| t.is_finite()).unwrap_or_default(),
            created_at,
            embedding_text: String::new(),
        };
        record.embedding_text = embedding_text(&record);

        let vector = self.embedder.embed(&record.embedding_text).await?;

        self.index
            .insert(IndexedDecision {
                id: record.record_id.clone(),
                document: record.embedding_text.clone(),
                metadata: record.metadata(),
                vector,
            })
            .await?;

        info!(
            "Stored decision {} for {} ({})",
            record.record_id, record.user_id, record.recommendation
        );
        Ok(record)
    }

    /// Best-effort write: failures are logged and the record is simply not stored.
    pub async fn store(&self, user_id: &str, decision: &DecisionInput) {
        if let Err(e) = self.try_store(user_id, decision).await {
            warn!("Error storing decision for {}: {}", user_id, e);
        }
    }


    pub async fn try_history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, MemoryError> {
        validate_user(user_id)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(&history_query(user_id)).await?;
        let hits = self
            .index
            .search(&query, &IndexFilter::user(user_id), limit)
            .await?;

        let history: Vec<HistoryEntry> = hits
            .into_iter()
            .filter(|h| h.metadata.user_id == user_id)
            .take(limit)
            .map(|h| HistoryEntry::from_parts(h.id, h.document, h.metadata, Some(h.score)))
            .collect();

        debug!("Retrieved {} history entries for {}", history.len(), user_id);
        Ok(history)
    }


    pub async fn get_history(&self, user_id: &str, limit: usize) -> Vec<HistoryEntry> {
        self.try_history(user_id, limit).await.unwrap_or_else(|e| {
            warn!("Error retrieving user history for {}: {}", user_id, e);
            Vec::new()
        })
    }

    /// Newest first, by `created_at`. Records with an unreadable timestamp sort last.
    pub async fn try_recent_history(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, MemoryError> {
        validate_user(user_id)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut history: Vec<HistoryEntry> = self
            .index
            .scan(&IndexFilter::user(user_id))
            .await?
            .into_iter()
            .filter(|e| e.metadata.user_id == user_id)
            .map(|e| HistoryEntry::from_parts(e.id, e.document, e.metadata, None))
            .collect();

        history.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.record_id.cmp(&a.record_id)));
        history.truncate(limit);
        Ok(history)
    }


    pub async fn get_recent_history(&self, user_id: &str, limit: usize) -> Vec<HistoryEntry> {
        self.try_recent_history(user_id, limit).await.unwrap_or_else(|e| {
            warn!("Error retrieving recent history for {}: {}", user_id, e);
            Vec::new()
        })
    }

    /// Aggregates over at most `STATS_HISTORY_LIMIT` similarity-ranked
    /// records, so users with longer histories get an approximation.
    pub async fn try_stats(&self, user_id: &str) -> Result<UserStats, MemoryError> {
        let history = self.try_history(user_id, STATS_HISTORY_LIMIT).await?;
        Ok(aggregate(&history))
    }


    pub async fn get_stats(&self, user_id: &str) -> UserStats {
        self.try_stats(user_id).await.unwrap_or_else(|e| {
            warn!("Error calculating user stats for {}: {}", user_id, e);
            UserStats::zero()
        })
    }
}

fn validate_user(user_id: &str) -> Result<(), MemoryError> {
    if user_id.trim().is_empty() {
        return Err(MemoryError::Validation("user_id must not be empty".to_string()));
    }
    Ok(())
}
