use anyhow::Result;

use crate::config::{ProfilesFile, RuntimeConfig};

pub fn run_profiles_list(profiles: &ProfilesFile, cfg: &RuntimeConfig) -> Result<()> {
    let mut names = profiles.profiles.keys().cloned().collect::<Vec<String>>();
    if !names.iter().any(|name| name == "default") {
        names.push("default".to_string());
    }
    names.sort();

    println!("Configured profiles (active='{}'):", cfg.profile);
    for name in names {
        let marker = if name == cfg.profile { "*" } else { " " };
        let source = if profiles.profiles.contains_key(&name) {
            "configured"
        } else {
            "implicit"
        };
        println!("{marker} {name} ({source})");
    }

    Ok(())
}

pub fn run_profiles_show(cfg: &RuntimeConfig) -> Result<()> {
    println!("Active profile: {}", cfg.profile);
    println!("Config path: {}", cfg.config_path);
    println!("Provider: {:?}", cfg.provider);
    println!(
        "Model: {}",
        cfg.model.as_deref().unwrap_or("<provider-default>")
    );
    println!("Embedding backend: {}", cfg.embedding_backend.label());
    println!("Embedding model: {}", cfg.embedding_model);
    println!("Embedding dimension: {}", cfg.embedding_dimension);
    println!("Similarity: {:?}", cfg.similarity);
    println!(
        "FAQ path: {}",
        cfg.faq_path.as_deref().unwrap_or("<built-in>")
    );
    println!("Participants: {}", cfg.participants);
    println!("Top k: {}", cfg.top_k);
    println!("Request timeout (secs): {}", cfg.request_timeout_secs);
    println!(
        "Generation retry attempts: {}",
        cfg.generation_retry_attempts
    );
    println!(
        "Generation retry delay (ms): {}",
        cfg.generation_retry_delay_ms
    );
    println!("Telemetry enabled: {}", cfg.telemetry_enabled);
    println!("Telemetry path: {}", cfg.telemetry_path);
    Ok(())
}
