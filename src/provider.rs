use clap::ValueEnum;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::Provider;
use crate::config::RuntimeConfig;
use crate::model::{
    EchoModel, GeminiModel, GenerativeModel, OpenAiCompatibleModel, RetryingModel, TimeoutModel,
};
use crate::retry::RetryPolicy;

pub fn validate_model_for_provider(provider: Provider, model_name: &str) -> Result<()> {
    let is_valid = match provider {
        Provider::Gemini => model_name.starts_with("gemini"),
        Provider::Openai => {
            model_name.starts_with("gpt-")
                || model_name.starts_with("o1")
                || model_name.starts_with("o3")
                || model_name.starts_with("o4")
        }
        Provider::Ollama => !model_name.trim().is_empty(),
        Provider::Echo => !model_name.trim().is_empty(),
        Provider::Auto => true,
    };

    if is_valid {
        return Ok(());
    }

    Err(anyhow::anyhow!(
        "model '{}' is not compatible with provider '{:?}'",
        model_name,
        provider
    ))
}

pub fn default_model_name(provider: Provider) -> &'static str {
    match provider {
        Provider::Gemini => "gemini-1.5-flash",
        Provider::Openai => "gpt-4o-mini",
        Provider::Ollama => "llama3.2",
        Provider::Echo | Provider::Auto => "echo",
    }
}

pub fn resolve_provider(cfg: &RuntimeConfig) -> Result<Provider> {
    match cfg.provider {
        Provider::Auto => detect_provider().context(
            "no provider could be auto-detected. Set one of GOOGLE_API_KEY, OPENAI_API_KEY \
             or OLLAMA_HOST, or use --provider echo for offline runs",
        ),
        p => Ok(p),
    }
}

/// Builds the generation backend for the resolved provider and applies the
/// configured time limit and retries to it.
pub fn resolve_model(cfg: &RuntimeConfig) -> Result<(Arc<dyn GenerativeModel>, Provider, String)> {
    let provider = resolve_provider(cfg)?;
    let model_name = cfg
        .model
        .clone()
        .unwrap_or_else(|| default_model_name(provider).to_string());
    validate_model_for_provider(provider, &model_name)?;
    let timeout = Duration::from_secs(cfg.request_timeout_secs);

    let model: Arc<dyn GenerativeModel> = match provider {
        Provider::Gemini => {
            let api_key = std::env::var("GOOGLE_API_KEY")
                .context("GOOGLE_API_KEY is required for Gemini provider")?;
            Arc::new(GeminiModel::new(api_key, model_name.clone(), timeout)?)
        }
        Provider::Openai => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY is required for OpenAI provider")?;
            let base_url = std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
            Arc::new(OpenAiCompatibleModel::new(
                base_url,
                Some(api_key),
                model_name.clone(),
                timeout,
            )?)
        }
        Provider::Ollama => {
            Arc::new(OpenAiCompatibleModel::new(
                ollama_base_url(),
                None,
                model_name.clone(),
                timeout,
            )?)
        }
        Provider::Echo => Arc::new(EchoModel::new(model_name.clone())),
        Provider::Auto => anyhow::bail!("provider must be resolved before building a model"),
    };

    Ok((apply_generation_policy(cfg, model), provider, model_name))
}

/// Each attempt gets its own `request_timeout_secs` budget, so a retry is
/// never cut short by earlier attempts or backoff sleeps.
pub fn apply_generation_policy(
    cfg: &RuntimeConfig,
    model: Arc<dyn GenerativeModel>,
) -> Arc<dyn GenerativeModel> {
    let bounded: Arc<dyn GenerativeModel> = Arc::new(TimeoutModel::new(
        model,
        Duration::from_secs(cfg.request_timeout_secs),
    ));
    if cfg.generation_retry_attempts == 0 {
        return bounded;
    }

    let policy = RetryPolicy::from_settings(
        cfg.generation_retry_attempts,
        cfg.generation_retry_delay_ms,
    );
    Arc::new(RetryingModel::new(bounded, policy))
}

pub fn ollama_base_url() -> String {
    let host =
        std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".to_string());
    format!("{}/v1", host.trim_end_matches('/'))
}

pub fn detect_provider() -> Option<Provider> {
    if env_present("GOOGLE_API_KEY") {
        return Some(Provider::Gemini);
    }
    if env_present("OPENAI_API_KEY") {
        return Some(Provider::Openai);
    }
    if env_present("OLLAMA_HOST") {
        return Some(Provider::Ollama);
    }
    None
}

pub fn env_present(key: &str) -> bool {
    std::env::var(key)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

pub fn parse_provider_name(value: &str) -> Result<Provider> {
    Provider::from_str(value, true).map_err(|_| {
        anyhow::anyhow!(
            "invalid provider '{}'. Supported values: auto, gemini, openai, ollama, echo",
            value
        )
    })
}
