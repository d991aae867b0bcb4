use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::embedding::EmbeddingFunction;
use crate::error::RetrievalError;
use crate::index::VectorIndex;

/// Turns a query into a context string: embed, fetch the `top_k` nearest
/// documents, join them one per line in the index's rank order.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingFunction>,
    index: Arc<dyn VectorIndex>,
    timeout: Option<Duration>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingFunction>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            timeout: None,
        }
    }

    /// Bounds the embedding call and the index query individually.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn embedder_name(&self) -> &'static str {
        self.embedder.backend_name()
    }

    pub async fn retrieve_documents(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<String>, RetrievalError> {
        let top_k = top_k.max(1);
        let embedding = bounded(self.timeout, self.embedder.embed(query)).await?;
        let documents = bounded(self.timeout, self.index.query(&embedding, top_k)).await?;
        tracing::debug!(
            embedder = self.embedder.backend_name(),
            index = self.index.backend_name(),
            top_k,
            documents = documents.len(),
            "Retrieved context documents"
        );
        Ok(documents)
    }

    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<String, RetrievalError> {
        let documents = self.retrieve_documents(query, top_k).await?;
        Ok(documents.join("\n"))
    }
}

async fn bounded<T, F>(timeout: Option<Duration>, call: F) -> Result<T, RetrievalError>
where
    F: Future<Output = Result<T, RetrievalError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| RetrievalError::Timeout(limit))?,
        None => call.await,
    }
}
