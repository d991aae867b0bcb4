use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing::level_filters::LevelFilter;

use faqchat::chat::{demo_queries, load_query_file, run_chat, run_queries};
use faqchat::cli::{Cli, Commands, ProfileCommands, TelemetryCommands, command_label};
use faqchat::config::{RuntimeConfig, load_profiles, resolve_runtime_config};
use faqchat::doctor::run_doctor;
use faqchat::error::{categorize_error, format_cli_error, render_error_message};
use faqchat::profiles::{run_profiles_list, run_profiles_show};
use faqchat::runner::build_pipeline;
use faqchat::telemetry::{TelemetrySink, run_telemetry_report};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let show_sensitive_config = cli.show_sensitive_config;
    if let Err(err) = run_cli(cli).await {
        eprintln!("{}", format_cli_error(&err, show_sensitive_config));
        tracing::error!(
            category = %categorize_error(&err).code(),
            error = %render_error_message(&err, show_sensitive_config),
            "command failed"
        );
        std::process::exit(1);
    }

    Ok(())
}

async fn run_cli(cli: Cli) -> Result<()> {
    init_tracing(&cli.log_filter)?;
    let profiles = load_profiles(&cli.config_path)?;
    let cfg = resolve_runtime_config(&cli, &profiles)?;
    let command = cli.command.unwrap_or(Commands::Chat);

    let telemetry = TelemetrySink::new(&cfg, command_label(&command));
    let started = Instant::now();
    let result = run_command(command, &cfg, &profiles, &telemetry).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(()) => telemetry.emit("command.completed", json!({ "duration_ms": duration_ms })),
        Err(err) => telemetry.emit(
            "command.failed",
            json!({
                "duration_ms": duration_ms,
                "category": categorize_error(err).code(),
                "error": render_error_message(err, cfg.show_sensitive_config),
            }),
        ),
    }

    result
}

async fn run_command(
    command: Commands,
    cfg: &RuntimeConfig,
    profiles: &faqchat::config::ProfilesFile,
    telemetry: &TelemetrySink,
) -> Result<()> {
    match command {
        Commands::Ask { prompt } => {
            let pipeline = build_pipeline(cfg, telemetry).await?;
            let prompt = prompt.join(" ");
            let turn = faqchat::chat::run_turn(&pipeline.scheduler, telemetry, &prompt).await?;
            println!("{}", turn.output);
        }
        Commands::Chat => {
            let pipeline = build_pipeline(cfg, telemetry).await?;
            run_chat(cfg, &pipeline, telemetry).await?;
        }
        Commands::Demo => {
            let pipeline = build_pipeline(cfg, telemetry).await?;
            run_queries(&pipeline, telemetry, &demo_queries(), cfg.show_sensitive_config).await?;
        }
        Commands::Run { file } => {
            let queries = load_query_file(Path::new(&file))?;
            let pipeline = build_pipeline(cfg, telemetry).await?;
            let summary =
                run_queries(&pipeline, telemetry, &queries, cfg.show_sensitive_config).await?;
            tracing::info!(
                answered = summary.answered,
                failed = summary.failed,
                "Query file finished"
            );
            if summary.failed > 0 {
                anyhow::bail!(
                    "{} of {} queries in '{}' failed",
                    summary.failed,
                    queries.len(),
                    file
                );
            }
        }
        Commands::Index => {
            let pipeline = build_pipeline(cfg, telemetry).await?;
            println!("Index backend: in-memory ({:?})", pipeline.index.metric());
            println!("Embedder: {}", pipeline.embedder.backend_name());
            println!("Documents: {}", pipeline.documents);
            println!(
                "Dimension: {}",
                pipeline
                    .index
                    .dimension()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "<unset>".to_string())
            );
            for document in pipeline.index.documents() {
                println!("- {}: {}", document.id, document.text);
            }
        }
        Commands::Doctor => run_doctor(cfg)?,
        Commands::Profiles { command } => match command {
            ProfileCommands::List => run_profiles_list(profiles, cfg)?,
            ProfileCommands::Show => run_profiles_show(cfg)?,
        },
        Commands::Telemetry { command } => match command {
            TelemetryCommands::Report { path, limit } => run_telemetry_report(cfg, path, limit)?,
        },
    }

    Ok(())
}

fn init_tracing(log_filter: &str) -> Result<()> {
    let level = log_filter
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(log_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}
