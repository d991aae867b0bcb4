use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use crate::index::SimilarityMetric;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Auto,
    Gemini,
    Openai,
    Ollama,
    Echo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingBackend {
    CharCode,
    Http,
}

impl EmbeddingBackend {
    pub fn label(self) -> &'static str {
        match self {
            EmbeddingBackend::CharCode => "char-code",
            EmbeddingBackend::Http => "http",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    #[command(about = "List configured profiles and highlight the active profile")]
    List,
    #[command(about = "Show the active profile's resolved runtime settings")]
    Show,
}

#[derive(Debug, Subcommand)]
pub enum TelemetryCommands {
    #[command(about = "Summarize telemetry events from a JSONL stream")]
    Report {
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value_t = 5000)]
        limit: usize,
    },
}

const CLI_EXAMPLES: &str = "Examples:\n\
  faqchat --provider echo demo\n\
  faqchat ask \"How can I change my password?\"\n\
  faqchat --participants 3 chat\n\
  faqchat --faq-path faq.toml --top-k 2 run --file queries.txt\n\
  faqchat --embedding-backend http --embedding-model text-embedding-3-small --embedding-dimension 1536 index\n\
  faqchat --generation-retry-attempts 3 --generation-retry-delay-ms 250 ask \"Tell me about the refund rules.\"\n\
  faqchat profiles show\n\
  faqchat telemetry report --limit 2000\n\
\n\
Turn scheduling:\n\
  - Each query is handed to the next participant in round-robin order.\n\
  - In chat, use /help, /status and /history; exit or quit ends the session.";

#[derive(Debug, Parser)]
#[command(name = "faqchat")]
#[command(about = "Retrieval-augmented FAQ chat with round-robin turn scheduling")]
#[command(after_long_help = CLI_EXAMPLES)]
pub struct Cli {
    #[arg(long, env = "FAQCHAT_PROVIDER", value_enum, default_value_t = Provider::Auto)]
    pub provider: Provider,

    #[arg(long, env = "FAQCHAT_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "FAQCHAT_PROFILE", default_value = "default")]
    pub profile: String,

    #[arg(long, env = "FAQCHAT_CONFIG", default_value = ".faqchat/config.toml")]
    pub config_path: String,

    #[arg(long, env = "FAQCHAT_EMBEDDING_BACKEND", value_enum)]
    pub embedding_backend: Option<EmbeddingBackend>,

    #[arg(long, env = "FAQCHAT_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    #[arg(long, env = "FAQCHAT_EMBEDDING_DIMENSION")]
    pub embedding_dimension: Option<usize>,

    #[arg(long, env = "FAQCHAT_SIMILARITY", value_enum)]
    pub similarity: Option<SimilarityMetric>,

    #[arg(long, env = "FAQCHAT_FAQ_PATH")]
    pub faq_path: Option<String>,

    #[arg(long, env = "FAQCHAT_PARTICIPANTS")]
    pub participants: Option<usize>,

    #[arg(long, env = "FAQCHAT_TOP_K")]
    pub top_k: Option<usize>,

    #[arg(long, env = "FAQCHAT_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "FAQCHAT_GENERATION_RETRY_ATTEMPTS")]
    pub generation_retry_attempts: Option<u32>,

    #[arg(long, env = "FAQCHAT_GENERATION_RETRY_DELAY_MS")]
    pub generation_retry_delay_ms: Option<u64>,

    #[arg(long, env = "FAQCHAT_TELEMETRY_ENABLED", action = clap::ArgAction::Set)]
    pub telemetry_enabled: Option<bool>,

    #[arg(long, env = "FAQCHAT_TELEMETRY_PATH")]
    pub telemetry_path: Option<String>,

    #[arg(long, env = "FAQCHAT_SHOW_SENSITIVE_CONFIG", default_value_t = false)]
    pub show_sensitive_config: bool,

    #[arg(long, env = "RUST_LOG", default_value = "error")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Answer one question and print the response")]
    Ask {
        #[arg(required = true)]
        prompt: Vec<String>,
    },
    #[command(about = "Run interactive chat mode")]
    Chat,
    #[command(about = "Answer the built-in demo questions")]
    Demo,
    #[command(about = "Answer questions read from a file, one per line")]
    Run {
        #[arg(long)]
        file: String,
    },
    #[command(about = "Populate the vector index and print its statistics")]
    Index,
    #[command(about = "Validate provider environment, FAQ source and embedding settings")]
    Doctor,
    #[command(about = "Inspect profile configuration and active resolved profile state")]
    Profiles {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    #[command(about = "Telemetry utilities and reporting")]
    Telemetry {
        #[command(subcommand)]
        command: TelemetryCommands,
    },
}

pub fn command_label(command: &Commands) -> String {
    match command {
        Commands::Ask { .. } => "ask".to_string(),
        Commands::Chat => "chat".to_string(),
        Commands::Demo => "demo".to_string(),
        Commands::Run { .. } => "run".to_string(),
        Commands::Index => "index".to_string(),
        Commands::Doctor => "doctor".to_string(),
        Commands::Profiles { command } => match command {
            ProfileCommands::List => "profiles.list".to_string(),
            ProfileCommands::Show => "profiles.show".to_string(),
        },
        Commands::Telemetry { command } => match command {
            TelemetryCommands::Report { .. } => "telemetry.report".to_string(),
        },
    }
}
