//! Deterministic doubles for exercising the store without network access.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::index::{IndexError, IndexFilter, IndexedDecision, SearchHit, SemanticIndex};
use crate::llm::embeddings::{Embedder, EmbeddingError};

const DIMS: usize = 64;

/// Bag-of-words hashed into a fixed number of buckets.
pub struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }
        let mut vector = vec![0.0f32; DIMS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            vector[(hasher.finish() % DIMS as u64) as usize] += 1.0;
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}


pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::InvalidResponse("embedding service down".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Raises on every operation and counts attempts.
#[derive(Default)]
pub struct FailingIndex {
    pub calls: AtomicUsize,
}

impl FailingIndex {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail(&self) -> IndexError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        IndexError::Unavailable("connection refused".to_string())
    }
}

#[async_trait]
impl SemanticIndex for FailingIndex {
    async fn insert(&self, _entry: IndexedDecision) -> Result<(), IndexError> {
        Err(self.fail())
    }

    async fn search(&self, _query: &[f32], _filter: &IndexFilter, _k: usize) -> Result<Vec<SearchHit>, IndexError> {
        Err(self.fail())
    }

    async fn scan(&self, _filter: &IndexFilter) -> Result<Vec<IndexedDecision>, IndexError> {
        Err(self.fail())
    }

    fn name(&self) -> &str {
        "failing"
    }
}
