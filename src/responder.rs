use std::sync::Arc;

use crate::error::GenerationError;
use crate::model::GenerativeModel;

/// Labels keep the grounding text and the question apart for the model.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!("Context: {context}\n\nQuestion: {query}")
}

/// One generation call per answer. Time limits and retries belong to the
/// model stack built by [`crate::provider::apply_generation_policy`].
#[derive(Clone)]
pub struct Responder {
    model: Arc<dyn GenerativeModel>,
}

impl Responder {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn respond(&self, query: &str, context: &str) -> Result<String, GenerationError> {
        let prompt = build_prompt(query, context);
        let text = self.model.generate(&prompt).await?;
        Ok(text.trim().to_string())
    }
}
