use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::RetrievalError;

pub type Embedding = Vec<f32>;

/// Maps text to a fixed-length vector. Implementations must be deterministic
/// for identical input and keep one dimensionality for their lifetime.
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    fn backend_name(&self) -> &'static str;
    fn dimension(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Embedding, RetrievalError>;
}

/// Placeholder embedding: one component per character code point, truncated
/// or zero-padded to `dimension`. Not semantic, but stable and offline.
#[derive(Debug, Clone)]
pub struct CharCodeEmbedding {
    dimension: usize,
}

impl CharCodeEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed_sync(&self, text: &str) -> Embedding {
        let mut vector = text
            .chars()
            .take(self.dimension)
            .map(|ch| ch as u32 as f32)
            .collect::<Embedding>();
        vector.resize(self.dimension, 0.0);
        vector
    }
}

impl Default for CharCodeEmbedding {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl EmbeddingFunction for CharCodeEmbedding {
    fn backend_name(&self) -> &'static str {
        "char-code"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, RetrievalError> {
        Ok(self.embed_sync(text))
    }
}

/// OpenAI-compatible `/embeddings` endpoint (OpenAI, Ollama's `/v1`, most
/// self-hosted gateways).
#[derive(Debug, Clone)]
pub struct HttpEmbedding {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

impl HttpEmbedding {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        dimension: usize,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build embedding http client: {e}"))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            dimension,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// `dimensions` asks OpenAI's `text-embedding-3-*` models to shorten their
/// native vectors to the index width. Ollama ignores the field.
pub fn embedding_request_body(model: &str, input: &str, dimension: usize) -> Value {
    json!({ "model": model, "input": input, "dimensions": dimension })
}

pub fn parse_embedding_response(body: &Value) -> Result<Embedding, RetrievalError> {
    let values = body
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
        .and_then(|item| item.get("embedding"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            RetrievalError::Embedding("response is missing data[0].embedding".to_string())
        })?;

    values
        .iter()
        .map(|value| {
            value.as_f64().map(|v| v as f32).ok_or_else(|| {
                RetrievalError::Embedding("embedding contains a non-numeric value".to_string())
            })
        })
        .collect()
}

#[async_trait]
impl EmbeddingFunction for HttpEmbedding {
    fn backend_name(&self) -> &'static str {
        "http"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding, RetrievalError> {
        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .json(&embedding_request_body(&self.model, text, self.dimension));
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding(format!(
                "embedding endpoint returned {}: {}",
                status.as_u16(),
                body.chars().take(300).collect::<String>()
            )));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| RetrievalError::Embedding(format!("invalid response body: {e}")))?;
        let embedding = parse_embedding_response(&body)?;
        if embedding.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        tracing::debug!(model = %self.model, dimension = embedding.len(), "Embedded text");
        Ok(embedding)
    }
}
