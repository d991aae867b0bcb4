use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::*;
use crate::index::SimilarityMetric;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub profile: String,
    pub config_path: String,
    pub provider: Provider,
    pub model: Option<String>,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub similarity: SimilarityMetric,
    pub faq_path: Option<String>,
    pub participants: usize,
    pub top_k: usize,
    pub request_timeout_secs: u64,
    pub generation_retry_attempts: u32,
    pub generation_retry_delay_ms: u64,
    pub show_sensitive_config: bool,
    pub telemetry_enabled: bool,
    pub telemetry_path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub embedding_backend: Option<EmbeddingBackend>,
    pub embedding_model: Option<String>,
    pub embedding_dimension: Option<usize>,
    pub similarity: Option<SimilarityMetric>,
    pub faq_path: Option<String>,
    pub participants: Option<usize>,
    pub top_k: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub generation_retry_attempts: Option<u32>,
    pub generation_retry_delay_ms: Option<u64>,
    pub telemetry_enabled: Option<bool>,
    pub telemetry_path: Option<String>,
}

pub fn load_profiles(config_path: &str) -> Result<ProfilesFile> {
    let path = Path::new(config_path);
    if !path.exists() {
        return Ok(ProfilesFile::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile config file at '{}'", path.display()))?;
    toml::from_str::<ProfilesFile>(&content).with_context(|| {
        format!(
            "invalid profile configuration in '{}'. Check provider/embedding values and field names.",
            path.display()
        )
    })
}

/// CLI flag (or its env var) wins, then the selected profile, then the default.
pub fn resolve_runtime_config(cli: &Cli, profiles: &ProfilesFile) -> Result<RuntimeConfig> {
    let selected = cli.profile.trim();
    if selected.is_empty() {
        return Err(anyhow::anyhow!(
            "profile name cannot be empty. Set --profile <name>."
        ));
    }

    let profile = if selected == "default" && !profiles.profiles.contains_key("default") {
        ProfileConfig::default()
    } else {
        profiles.profiles.get(selected).cloned().ok_or_else(|| {
            let mut names = profiles.profiles.keys().cloned().collect::<Vec<String>>();
            names.sort();
            if names.is_empty() {
                anyhow::anyhow!(
                    "profile '{}' not found in '{}'. No profiles are defined yet.",
                    selected,
                    cli.config_path
                )
            } else {
                anyhow::anyhow!(
                    "profile '{}' not found in '{}'. Available profiles: {}",
                    selected,
                    cli.config_path,
                    names.join(", ")
                )
            }
        })?
    };

    let provider = if cli.provider != Provider::Auto {
        cli.provider
    } else {
        profile.provider.unwrap_or(Provider::Auto)
    };

    Ok(RuntimeConfig {
        profile: selected.to_string(),
        config_path: cli.config_path.clone(),
        provider,
        model: cli.model.clone().or(profile.model),
        embedding_backend: cli
            .embedding_backend
            .or(profile.embedding_backend)
            .unwrap_or(EmbeddingBackend::CharCode),
        embedding_model: cli
            .embedding_model
            .clone()
            .or(profile.embedding_model)
            .unwrap_or_else(|| "text-embedding-3-small".to_string()),
        embedding_dimension: cli
            .embedding_dimension
            .or(profile.embedding_dimension)
            .unwrap_or(128)
            .max(1),
        similarity: cli.similarity.or(profile.similarity).unwrap_or_default(),
        faq_path: cli.faq_path.clone().or(profile.faq_path),
        // Zero is passed through; the runner rejects it as a configuration error.
        participants: cli.participants.or(profile.participants).unwrap_or(1),
        top_k: cli.top_k.or(profile.top_k).unwrap_or(3).max(1),
        request_timeout_secs: cli
            .request_timeout_secs
            .or(profile.request_timeout_secs)
            .unwrap_or(30)
            .max(1),
        generation_retry_attempts: cli
            .generation_retry_attempts
            .or(profile.generation_retry_attempts)
            .unwrap_or(0),
        generation_retry_delay_ms: cli
            .generation_retry_delay_ms
            .or(profile.generation_retry_delay_ms)
            .unwrap_or(500),
        show_sensitive_config: cli.show_sensitive_config,
        telemetry_enabled: cli
            .telemetry_enabled
            .or(profile.telemetry_enabled)
            .unwrap_or(true),
        telemetry_path: cli
            .telemetry_path
            .clone()
            .or(profile.telemetry_path)
            .unwrap_or_else(|| ".faqchat/telemetry/events.jsonl".to_string()),
    })
}
