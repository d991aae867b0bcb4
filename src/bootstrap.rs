use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingFunction;
use crate::error::{ConfigurationError, OrchestratorError};
use crate::index::VectorIndex;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FaqEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
}

impl FaqEntry {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Stored text, returned verbatim as retrieval context.
    pub fn document_text(&self) -> String {
        format!("{} {}", self.question, self.answer)
    }

    /// Input handed to the embedder. No separator, matching how the
    /// built-in collection has always been embedded.
    pub fn embedding_text(&self) -> String {
        format!("{}{}", self.question, self.answer)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FaqFile {
    #[serde(default)]
    entries: Vec<FaqEntry>,
}

pub fn builtin_faq_entries() -> Vec<FaqEntry> {
    vec![
        FaqEntry::new(
            "1",
            "How do I reset my password?",
            "Go to settings > reset password.",
        ),
        FaqEntry::new(
            "2",
            "What is the refund policy?",
            "Refunds are allowed within 30 days.",
        ),
    ]
}

/// Reads FAQ entries from `.json` (a top-level array) or TOML (`[[entries]]`).
pub fn load_faq_entries(path: &Path) -> Result<Vec<FaqEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read faq file '{}'", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str::<Vec<FaqEntry>>(&content).with_context(|| {
            format!(
                "invalid faq file '{}'. Expected a JSON array of {{id, question, answer}} objects.",
                path.display()
            )
        })
    } else {
        toml::from_str::<FaqFile>(&content)
            .map(|file| file.entries)
            .with_context(|| {
                format!(
                    "invalid faq file '{}'. Expected [[entries]] tables with id, question and answer.",
                    path.display()
                )
            })
    }
}

pub fn load_faq_source(path: Option<&str>) -> Result<Vec<FaqEntry>> {
    match path.map(str::trim).filter(|value| !value.is_empty()) {
        Some(path) => load_faq_entries(Path::new(path)),
        None => Ok(builtin_faq_entries()),
    }
}

/// Embeds and upserts every entry. Ids are checked for uniqueness before
/// anything is written, so a rejected batch leaves the index untouched.
pub async fn populate_index(
    embedder: &dyn EmbeddingFunction,
    index: &dyn VectorIndex,
    entries: &[FaqEntry],
) -> Result<usize, OrchestratorError> {
    let mut seen = HashSet::<&str>::new();
    for entry in entries {
        if !seen.insert(entry.id.as_str()) {
            return Err(ConfigurationError::DuplicateDocumentId(entry.id.clone()).into());
        }
    }

    for entry in entries {
        let embedding = embedder.embed(&entry.embedding_text()).await?;
        index
            .upsert(&entry.id, &entry.document_text(), embedding)
            .await?;
    }

    tracing::info!(
        documents = entries.len(),
        embedder = embedder.backend_name(),
        index = index.backend_name(),
        "Populated vector index"
    );
    Ok(entries.len())
}
