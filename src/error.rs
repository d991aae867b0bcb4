use std::time::Duration;

use thiserror::Error;

/// Fatal setup problems. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("turn scheduler has an empty participant set")]
    EmptyParticipantSet,
    #[error("duplicate document id '{0}' in index population")]
    DuplicateDocumentId(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("vector index query failed: {0}")]
    Index(String),
    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),
}

/// Model failures, split so callers can decide whether a retry makes sense.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation temporarily unavailable ({kind}): {message}")]
    Transient { kind: String, message: String },
    #[error("generation rejected ({kind}): {message}")]
    Permanent { kind: String, message: String },
}

impl GenerationError {
    pub fn transient(kind: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::Transient {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn permanent(kind: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationError::Permanent {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, GenerationError::Transient { .. })
    }

    pub fn kind(&self) -> &str {
        match self {
            GenerationError::Transient { kind, .. } | GenerationError::Permanent { kind, .. } => {
                kind
            }
        }
    }

    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => Self::transient("rate_limit", message),
            408 => Self::transient("timeout", message),
            500..=599 => Self::transient("server_error", message),
            400 => Self::permanent("bad_request", message),
            401 => Self::permanent("unauthorized", message),
            403 => Self::permanent("forbidden", message),
            404 => Self::permanent("not_found", message),
            _ => Self::permanent("unexpected_status", message),
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        let message = redact_sensitive_text(&err.to_string());
        if err.is_timeout() {
            Self::transient("timeout", message)
        } else if err.is_connect() {
            Self::transient("network", message)
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), message)
        } else if err.is_decode() {
            Self::permanent("malformed_response", message)
        } else {
            Self::transient("request", message)
        }
    }
}

/// Everything a dispatch can fail with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Retrieval,
    Generation,
    Provider,
    Input,
    Internal,
}

impl ErrorCategory {
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::Config => "CONFIG",
            ErrorCategory::Retrieval => "RETRIEVAL",
            ErrorCategory::Generation => "GENERATION",
            ErrorCategory::Provider => "PROVIDER",
            ErrorCategory::Input => "INPUT",
            ErrorCategory::Internal => "INTERNAL",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ErrorCategory::Config => {
                "Check --participants, the FAQ file ids and the active profile in .faqchat/config.toml."
            }
            ErrorCategory::Retrieval => {
                "Check --embedding-backend/--embedding-dimension and retry with RUST_LOG=debug for index logs."
            }
            ErrorCategory::Generation => {
                "Transient failures can be retried (see --generation-retry-attempts); permanent ones need a corrected request or model."
            }
            ErrorCategory::Provider => {
                "Set provider credentials (for example GOOGLE_API_KEY) or run with --provider echo."
            }
            ErrorCategory::Input => "Run faqchat --help and correct command arguments.",
            ErrorCategory::Internal => {
                "Retry with RUST_LOG=debug. If it persists, capture logs and open an issue."
            }
        }
    }
}

fn typed_category(err: &anyhow::Error) -> Option<ErrorCategory> {
    for cause in err.chain() {
        if let Some(orchestrator) = cause.downcast_ref::<OrchestratorError>() {
            return Some(match orchestrator {
                OrchestratorError::Configuration(_) => ErrorCategory::Config,
                OrchestratorError::Retrieval(_) => ErrorCategory::Retrieval,
                OrchestratorError::Generation(_) => ErrorCategory::Generation,
            });
        }
        if cause.downcast_ref::<ConfigurationError>().is_some() {
            return Some(ErrorCategory::Config);
        }
        if cause.downcast_ref::<RetrievalError>().is_some() {
            return Some(ErrorCategory::Retrieval);
        }
        if cause.downcast_ref::<GenerationError>().is_some() {
            return Some(ErrorCategory::Generation);
        }
    }
    None
}

pub fn categorize_error(err: &anyhow::Error) -> ErrorCategory {
    if let Some(category) = typed_category(err) {
        return category;
    }

    let msg = format!("{err:#}").to_ascii_lowercase();

    if msg.contains("api_key")
        || msg.contains("no provider could be auto-detected")
        || msg.contains("provider")
    {
        return ErrorCategory::Provider;
    }

    if msg.contains("invalid value")
        || msg.contains("unknown argument")
        || msg.contains("failed to read input")
        || msg.contains("query file")
    {
        return ErrorCategory::Input;
    }

    if msg.contains("profile") || msg.contains("faq file") || msg.contains("participant") {
        return ErrorCategory::Config;
    }

    if msg.contains("embedding") || msg.contains("index") || msg.contains("retrieval") {
        return ErrorCategory::Retrieval;
    }

    ErrorCategory::Internal
}

pub fn format_cli_error(err: &anyhow::Error, show_sensitive_config: bool) -> String {
    let category = categorize_error(err);
    let rendered_error = render_error_message(err, show_sensitive_config);
    format!(
        "[{}] {}\nHint: {}",
        category.code(),
        rendered_error,
        category.hint()
    )
}

pub fn render_error_message(err: &anyhow::Error, show_sensitive_config: bool) -> String {
    let message = format!("{err:#}");
    if show_sensitive_config {
        message
    } else {
        redact_sensitive_text(&message)
    }
}

pub fn redact_sensitive_text(text: &str) -> String {
    redact_key_params(text)
}

/// Masks `key=<value>` query parameters, which is how API keys leak into
/// request URLs embedded in transport errors.
pub fn redact_key_params(text: &str) -> String {
    const KEY_PREFIX: &str = "key=";
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    while let Some(offset) = text[cursor..].find(KEY_PREFIX) {
        let start = cursor + offset;
        let value_start = start + KEY_PREFIX.len();
        out.push_str(&text[cursor..value_start]);

        let remainder = &text[value_start..];
        let end = remainder
            .find(|ch: char| {
                ch.is_whitespace() || matches!(ch, '&' | '"' | '\'' | ')' | ']' | '}' | ',' | ';')
            })
            .unwrap_or(remainder.len());
        if end > 0 {
            out.push_str("[REDACTED]");
        }
        cursor = value_start + end;
    }

    out.push_str(&text[cursor..]);
    out
}
