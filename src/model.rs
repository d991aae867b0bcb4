use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::GenerationError;
use crate::retry::{RetryPolicy, retry_transient};

/// Text-in, text-out generation backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Offline stand-in that answers with a prefix of the prompt.
#[derive(Debug, Clone)]
pub struct EchoModel {
    model: String,
}

impl EchoModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

#[async_trait]
impl GenerativeModel for EchoModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let head = prompt.chars().take(50).collect::<String>();
        Ok(format!("LLM({}) response to: {}...", self.model, head))
    }
}

fn build_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build model http client: {e}"))
}

async fn send_json(request: reqwest::RequestBuilder) -> Result<Value, GenerationError> {
    let response = request
        .send()
        .await
        .map_err(|e| GenerationError::from_reqwest(&e))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::from_status(
            status.as_u16(),
            body.chars().take(500).collect(),
        ));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| GenerationError::from_reqwest(&e))
}

#[derive(Debug, Clone)]
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiModel {
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(api_key: String, model: String, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_key,
            model,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

pub fn parse_gemini_response(body: &Value) -> Result<String, GenerationError> {
    if let Some(reason) = body
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(GenerationError::permanent(
            "policy",
            format!("prompt blocked: {reason}"),
        ));
    }

    let candidate = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .ok_or_else(|| {
            GenerationError::permanent("empty_response", "response contained no candidates")
        })?;

    if candidate.get("finishReason").and_then(Value::as_str) == Some("SAFETY") {
        return Err(GenerationError::permanent(
            "policy",
            "candidate withheld by safety filter",
        ));
    }

    let text = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default();
    Ok(text)
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
            }));
        let body = send_json(request).await?;
        parse_gemini_response(&body)
    }
}

/// Chat-completions API shared by OpenAI and Ollama's `/v1` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatibleModel {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }
}

pub fn parse_chat_completion(body: &Value) -> Result<String, GenerationError> {
    let choice = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| {
            GenerationError::permanent("empty_response", "response contained no choices")
        })?;

    if choice.get("finish_reason").and_then(Value::as_str) == Some("content_filter") {
        return Err(GenerationError::permanent(
            "policy",
            "completion withheld by content filter",
        ));
    }

    Ok(choice
        .pointer("/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

#[async_trait]
impl GenerativeModel for OpenAiCompatibleModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }]
            }));
        if let Some(key) = self.api_key.as_deref() {
            request = request.bearer_auth(key);
        }
        let body = send_json(request).await?;
        parse_chat_completion(&body)
    }
}

/// Bounds each call to the wrapped model. An elapsed call becomes a
/// transient `timeout` failure.
pub struct TimeoutModel {
    inner: Arc<dyn GenerativeModel>,
    limit: Duration,
}

impl TimeoutModel {
    pub fn new(inner: Arc<dyn GenerativeModel>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl GenerativeModel for TimeoutModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        tokio::time::timeout(self.limit, self.inner.generate(prompt))
            .await
            .map_err(|_| {
                GenerationError::transient(
                    "timeout",
                    format!(
                        "model '{}' did not answer within {:?}",
                        self.inner.name(),
                        self.limit
                    ),
                )
            })?
    }
}

/// Retries transient failures of the wrapped model under a [`RetryPolicy`].
/// Wrap a [`TimeoutModel`] so the time limit applies to each attempt.
pub struct RetryingModel {
    inner: Arc<dyn GenerativeModel>,
    policy: RetryPolicy,
}

impl RetryingModel {
    pub fn new(inner: Arc<dyn GenerativeModel>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl GenerativeModel for RetryingModel {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        retry_transient(&self.policy, || self.inner.generate(prompt)).await
    }
}
