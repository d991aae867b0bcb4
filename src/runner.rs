use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;

use crate::bootstrap::{load_faq_source, populate_index};
use crate::cli::{EmbeddingBackend, Provider};
use crate::config::RuntimeConfig;
use crate::embedding::{CharCodeEmbedding, EmbeddingFunction, HttpEmbedding};
use crate::error::ConfigurationError;
use crate::index::{InMemoryVectorIndex, VectorIndex};
use crate::model::GenerativeModel;
use crate::participant::{Participant, RetrieverResponder};
use crate::provider::{env_present, ollama_base_url, resolve_model};
use crate::responder::Responder;
use crate::retrieval::Retriever;
use crate::scheduler::TurnScheduler;
use crate::telemetry::TelemetrySink;

/// Everything a command needs to answer queries.
pub struct Pipeline {
    pub scheduler: TurnScheduler,
    pub index: Arc<InMemoryVectorIndex>,
    pub embedder: Arc<dyn EmbeddingFunction>,
    pub provider: Provider,
    pub model_name: String,
    pub documents: usize,
}

pub fn build_embedder(cfg: &RuntimeConfig) -> Result<Arc<dyn EmbeddingFunction>> {
    match cfg.embedding_backend {
        EmbeddingBackend::CharCode => Ok(Arc::new(CharCodeEmbedding::new(cfg.embedding_dimension))),
        EmbeddingBackend::Http => {
            let (base_url, api_key) = if env_present("OPENAI_API_KEY") {
                (
                    std::env::var("OPENAI_BASE_URL")
                        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                    std::env::var("OPENAI_API_KEY").ok(),
                )
            } else {
                (ollama_base_url(), None)
            };
            let embedder = HttpEmbedding::new(
                base_url,
                api_key,
                cfg.embedding_model.clone(),
                cfg.embedding_dimension,
                Duration::from_secs(cfg.request_timeout_secs),
            )
            .context("failed to build http embedding backend")?;
            tracing::info!(
                model = embedder.model(),
                dimension = cfg.embedding_dimension,
                "Using http embedding backend"
            );
            Ok(Arc::new(embedder))
        }
    }
}

pub fn build_index(cfg: &RuntimeConfig) -> Arc<InMemoryVectorIndex> {
    Arc::new(InMemoryVectorIndex::with_dimension(
        cfg.similarity,
        cfg.embedding_dimension,
    ))
}

/// One `RetrieverResponder` per configured participant, all sharing the
/// same embedder, index and model. The model is used as given; see
/// [`crate::provider::apply_generation_policy`] for its time limit.
pub fn build_participants(
    cfg: &RuntimeConfig,
    embedder: Arc<dyn EmbeddingFunction>,
    index: Arc<dyn VectorIndex>,
    model: Arc<dyn GenerativeModel>,
) -> Result<Vec<Arc<dyn Participant>>, ConfigurationError> {
    if cfg.participants == 0 {
        return Err(ConfigurationError::EmptyParticipantSet);
    }

    let retriever = Retriever::new(embedder, index)
        .with_timeout(Duration::from_secs(cfg.request_timeout_secs));
    let responder = Responder::new(model);

    Ok((1..=cfg.participants)
        .map(|i| {
            Arc::new(RetrieverResponder::new(
                format!("responder-{i}"),
                retriever.clone(),
                responder.clone(),
                cfg.top_k,
            )) as Arc<dyn Participant>
        })
        .collect())
}

pub async fn build_pipeline(cfg: &RuntimeConfig, telemetry: &TelemetrySink) -> Result<Pipeline> {
    let (model, provider, model_name) = resolve_model(cfg)?;
    telemetry.emit(
        "model.resolved",
        json!({
            "provider": format!("{:?}", provider).to_ascii_lowercase(),
            "model": model_name.clone(),
        }),
    );
    build_pipeline_with_model(cfg, model, provider, model_name).await
}

pub async fn build_pipeline_with_model(
    cfg: &RuntimeConfig,
    model: Arc<dyn GenerativeModel>,
    provider: Provider,
    model_name: String,
) -> Result<Pipeline> {
    let embedder = build_embedder(cfg)?;
    let index = build_index(cfg);

    // Fail on a bad participant count before spending any embedding calls.
    let participants = build_participants(
        cfg,
        Arc::clone(&embedder),
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        model,
    )?;

    let entries = load_faq_source(cfg.faq_path.as_deref())?;
    let documents = populate_index(embedder.as_ref(), index.as_ref(), &entries)
        .await
        .context("failed to populate the FAQ index")?;

    let scheduler = TurnScheduler::new(participants);
    tracing::info!(
        participants = scheduler.len(),
        documents,
        provider = ?provider,
        model = %model_name,
        "Pipeline ready"
    );

    Ok(Pipeline {
        scheduler,
        index,
        embedder,
        provider,
        model_name,
        documents,
    })
}
