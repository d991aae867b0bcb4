use std::cmp::Ordering;
use std::sync::RwLock;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::Deserialize;

use crate::embedding::Embedding;
use crate::error::RetrievalError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

/// Stores `(id, document, embedding)` triples and answers nearest-neighbour
/// queries, most similar first.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn backend_name(&self) -> &'static str;
    async fn upsert(&self, id: &str, text: &str, embedding: Embedding)
    -> Result<(), RetrievalError>;
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<String>, RetrievalError>;
    async fn len(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    SquaredL2,
}

impl SimilarityMetric {
    /// Higher is closer for both metrics.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            SimilarityMetric::Cosine => cosine_similarity(a, b),
            SimilarityMetric::SquaredL2 => -squared_l2(a, b),
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

#[derive(Debug, Clone)]
struct IndexEntry {
    document: Document,
    embedding: Embedding,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
}

/// Exhaustive in-memory index. The dimension is fixed either up front or by
/// the first insert; re-upserting an id replaces the entry in place.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    metric: SimilarityMetric,
    state: RwLock<IndexState>,
}

impl InMemoryVectorIndex {
    pub fn new(metric: SimilarityMetric) -> Self {
        Self {
            metric,
            state: RwLock::new(IndexState::default()),
        }
    }

    pub fn with_dimension(metric: SimilarityMetric, dimension: usize) -> Self {
        Self {
            metric,
            state: RwLock::new(IndexState {
                entries: Vec::new(),
                dimension: Some(dimension),
            }),
        }
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn dimension(&self) -> Option<usize> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).dimension
    }

    pub fn documents(&self) -> Vec<Document> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .map(|entry| entry.document.clone())
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .find(|entry| entry.document.id == id)
            .map(|entry| entry.document.clone())
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn upsert(
        &self,
        id: &str,
        text: &str,
        embedding: Embedding,
    ) -> Result<(), RetrievalError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        match state.dimension {
            Some(expected) if expected != embedding.len() => {
                return Err(RetrievalError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            Some(_) => {}
            None => state.dimension = Some(embedding.len()),
        }

        let entry = IndexEntry {
            document: Document {
                id: id.to_string(),
                text: text.to_string(),
            },
            embedding,
        };
        match state.entries.iter_mut().find(|e| e.document.id == id) {
            Some(existing) => *existing = entry,
            None => state.entries.push(entry),
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<String>, RetrievalError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if state.entries.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = state.dimension
            && expected != embedding.len()
        {
            return Err(RetrievalError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }

        let mut scored = state
            .entries
            .iter()
            .map(|entry| (self.metric.score(embedding, &entry.embedding), entry))
            .collect::<Vec<_>>();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(_, entry)| entry.document.text.clone())
            .collect())
    }

    async fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }
}
