use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::config::RuntimeConfig;
use crate::error::{OrchestratorError, format_cli_error};
use crate::runner::Pipeline;
use crate::scheduler::{ConversationTurn, TurnScheduler};
use crate::telemetry::TelemetrySink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Exit,
    Status,
    Help,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedChatCommand {
    NotACommand,
    Command(ChatCommand),
    UnknownCommand(String),
}

pub fn is_exit_word(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit")
}

pub fn parse_chat_command(input: &str) -> ParsedChatCommand {
    let trimmed = input.trim();

    if is_exit_word(trimmed) {
        return ParsedChatCommand::Command(ChatCommand::Exit);
    }

    if !trimmed.starts_with('/') {
        return ParsedChatCommand::NotACommand;
    }

    let slashless = trimmed.trim_start_matches('/');
    if slashless.is_empty() {
        return ParsedChatCommand::UnknownCommand("/".to_string());
    }

    let command = slashless
        .split_whitespace()
        .next()
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();

    match command.as_str() {
        "exit" | "quit" => ParsedChatCommand::Command(ChatCommand::Exit),
        "status" => ParsedChatCommand::Command(ChatCommand::Status),
        "help" => ParsedChatCommand::Command(ChatCommand::Help),
        "history" => ParsedChatCommand::Command(ChatCommand::History),
        other => ParsedChatCommand::UnknownCommand(format!("/{other}")),
    }
}

pub fn print_chat_help() {
    println!("Chat commands:");
    println!("- /help: show command quick reference");
    println!("- /status: show profile, provider, model and turn scheduling state");
    println!("- /history: list the turns answered in this session");
    println!("- /exit, exit or quit: leave chat");
}

pub fn demo_queries() -> Vec<String> {
    vec![
        "How can I change my password?".to_string(),
        "Tell me about the refund rules.".to_string(),
    ]
}

/// Non-empty trimmed lines up to (not including) the first `exit`/`quit`.
pub fn parse_query_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take_while(|line| !is_exit_word(line))
        .map(str::to_string)
        .collect()
}

pub fn load_query_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read query file '{}'", path.display()))?;
    Ok(parse_query_lines(&content))
}

/// Dispatches one query and records its outcome.
pub async fn run_turn(
    scheduler: &TurnScheduler,
    telemetry: &TelemetrySink,
    query: &str,
) -> Result<ConversationTurn, OrchestratorError> {
    match scheduler.dispatch_turn(query).await {
        Ok(turn) => {
            telemetry.emit(
                "turn.completed",
                json!({
                    "participant": turn.participant.clone(),
                    "turn_index": turn.participant_index,
                    "latency_ms": turn.latency_ms,
                    "output_chars": turn.output.len(),
                }),
            );
            Ok(turn)
        }
        Err(failure) => {
            telemetry.emit(
                "turn.failed",
                json!({
                    "participant": failure.participant,
                    "turn_index": failure.participant_index,
                    "error": failure.error.to_string(),
                }),
            );
            Err(failure.error)
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueryRunSummary {
    pub answered: usize,
    pub failed: usize,
}

/// Answers `queries` in order, printing a `User:`/`Bot:` transcript.
/// Retrieval and generation failures are reported and skipped; a
/// configuration failure stops the run.
pub async fn run_queries(
    pipeline: &Pipeline,
    telemetry: &TelemetrySink,
    queries: &[String],
    show_sensitive_config: bool,
) -> Result<QueryRunSummary> {
    let mut summary = QueryRunSummary::default();
    for query in queries {
        println!("User: {query}");
        match run_turn(&pipeline.scheduler, telemetry, query).await {
            Ok(turn) => {
                println!("Bot: {}\n", turn.output);
                summary.answered += 1;
            }
            Err(err @ OrchestratorError::Configuration(_)) => return Err(err.into()),
            Err(err) => {
                eprintln!(
                    "{}",
                    format_cli_error(&anyhow::Error::from(err), show_sensitive_config)
                );
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

fn print_status(cfg: &RuntimeConfig, pipeline: &Pipeline, history: &[ConversationTurn]) {
    println!("Profile: {}", cfg.profile);
    println!(
        "Provider: {:?} (model: {})",
        pipeline.provider, pipeline.model_name
    );
    println!(
        "Participants: {} ({})",
        pipeline.scheduler.len(),
        pipeline.scheduler.participant_names().join(", ")
    );
    println!("Next turn: participant #{}", pipeline.scheduler.cursor());
    println!(
        "Index: {} documents, embedder={}, top_k={}",
        pipeline.documents,
        pipeline.embedder.backend_name(),
        cfg.top_k
    );
    println!("Turns answered: {}", history.len());
}

fn print_history(history: &[ConversationTurn]) {
    if history.is_empty() {
        println!("No turns yet.");
        return;
    }
    for (n, turn) in history.iter().enumerate() {
        println!(
            "{}. [{} {}] {} -> {}",
            n + 1,
            turn.at.format("%H:%M:%S"),
            turn.participant,
            turn.input,
            turn.output
        );
    }
}

pub async fn run_chat(
    cfg: &RuntimeConfig,
    pipeline: &Pipeline,
    telemetry: &TelemetrySink,
) -> Result<Vec<ConversationTurn>> {
    run_chat_with_input(cfg, pipeline, telemetry, io::BufReader::new(io::stdin())).await
}

/// Chat loop over any line source. Returns the answered turns once input
/// is exhausted or an exit command is read.
pub async fn run_chat_with_input<R: BufRead>(
    cfg: &RuntimeConfig,
    pipeline: &Pipeline,
    telemetry: &TelemetrySink,
    mut input: R,
) -> Result<Vec<ConversationTurn>> {
    telemetry.emit(
        "chat.started",
        json!({
            "provider": format!("{:?}", pipeline.provider).to_ascii_lowercase(),
            "model": pipeline.model_name.clone(),
            "participants": pipeline.scheduler.len(),
        }),
    );
    println!("Interactive mode started. Type /help for commands or exit to quit.");

    let mut history = Vec::<ConversationTurn>::new();
    let mut line = String::new();

    loop {
        print!("faqchat> ");
        io::stdout().flush().context("failed to flush stdout")?;
        line.clear();
        let read = input
            .read_line(&mut line)
            .context("failed to read input from stdin")?;
        if read == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        match parse_chat_command(query) {
            ParsedChatCommand::NotACommand => {}
            ParsedChatCommand::UnknownCommand(command) => {
                println!("Unknown command '{command}'. Use /help.");
                continue;
            }
            ParsedChatCommand::Command(ChatCommand::Exit) => break,
            ParsedChatCommand::Command(ChatCommand::Help) => {
                print_chat_help();
                continue;
            }
            ParsedChatCommand::Command(ChatCommand::Status) => {
                print_status(cfg, pipeline, &history);
                continue;
            }
            ParsedChatCommand::Command(ChatCommand::History) => {
                print_history(&history);
                continue;
            }
        }

        match run_turn(&pipeline.scheduler, telemetry, query).await {
            Ok(turn) => {
                println!("{}", turn.output);
                history.push(turn);
            }
            Err(err @ OrchestratorError::Configuration(_)) => return Err(err.into()),
            Err(err) => {
                eprintln!(
                    "{}",
                    format_cli_error(&anyhow::Error::from(err), cfg.show_sensitive_config)
                );
            }
        }
    }

    telemetry.emit("chat.finished", json!({ "turns": history.len() }));
    Ok(history)
}
