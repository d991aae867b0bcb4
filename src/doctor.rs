use std::path::Path;

use anyhow::Result;

use crate::bootstrap::load_faq_source;
use crate::cli::{EmbeddingBackend, Provider};
use crate::config::RuntimeConfig;
use crate::provider::{default_model_name, detect_provider, env_present};

pub fn run_doctor(cfg: &RuntimeConfig) -> Result<()> {
    println!(
        "Active profile: '{}' (config: {})",
        cfg.profile, cfg.config_path
    );

    let checks = [
        ("GOOGLE_API_KEY", env_present("GOOGLE_API_KEY")),
        ("OPENAI_API_KEY", env_present("OPENAI_API_KEY")),
        ("OLLAMA_HOST", env_present("OLLAMA_HOST")),
    ];

    println!("Provider environment check:");
    for (key, ok) in checks {
        let status = if ok { "set" } else { "missing" };
        println!("- {key}: {status}");
    }

    let detected = detect_provider();
    match detected {
        Some(provider) => println!("Auto provider resolution: {:?}", provider),
        None => {
            println!("Auto provider resolution: none");
            println!("Tip: export one provider key or run with --provider echo");
        }
    }

    let effective = match cfg.provider {
        Provider::Auto => detected,
        provider => Some(provider),
    };
    println!(
        "Generation: provider={} model={} timeout_secs={} retry_attempts={} retry_delay_ms={}",
        effective
            .map(|p| format!("{p:?}"))
            .unwrap_or_else(|| "<unresolved>".to_string()),
        cfg.model
            .clone()
            .or_else(|| effective.map(|p| default_model_name(p).to_string()))
            .unwrap_or_else(|| "<provider-default>".to_string()),
        cfg.request_timeout_secs,
        cfg.generation_retry_attempts,
        cfg.generation_retry_delay_ms
    );

    println!(
        "Embedding: backend={} dimension={} similarity={:?}",
        cfg.embedding_backend.label(),
        cfg.embedding_dimension,
        cfg.similarity
    );
    if cfg.embedding_backend == EmbeddingBackend::Http {
        println!("Embedding model: {}", cfg.embedding_model);
        if !env_present("OPENAI_API_KEY") && !env_present("OLLAMA_HOST") {
            println!("Tip: http embeddings need OPENAI_API_KEY or OLLAMA_HOST");
        }
    }

    match cfg.faq_path.as_deref() {
        Some(path) if !Path::new(path).exists() => {
            println!("FAQ source: {path} (missing)");
        }
        path => match load_faq_source(path) {
            Ok(entries) => println!(
                "FAQ source: {} ({} entries)",
                path.unwrap_or("<built-in>"),
                entries.len()
            ),
            Err(err) => println!("FAQ source: invalid ({err:#})"),
        },
    }

    println!(
        "Scheduling: participants={} top_k={}",
        cfg.participants, cfg.top_k
    );
    if cfg.participants == 0 {
        println!("Tip: --participants must be at least 1");
    }
    println!(
        "Telemetry: enabled={} path={}",
        cfg.telemetry_enabled, cfg.telemetry_path
    );

    Ok(())
}
