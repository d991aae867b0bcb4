use async_trait::async_trait;

use crate::error::OrchestratorError;
use crate::responder::Responder;
use crate::retrieval::Retriever;

/// Anything that can take one conversational turn.
#[async_trait]
pub trait Participant: Send + Sync {
    fn name(&self) -> &str;
    async fn handle(&self, query: &str) -> Result<String, OrchestratorError>;
}

/// Retrieve-then-generate pipeline. Holds no per-call state, so one
/// instance can serve any number of turns.
#[derive(Clone)]
pub struct RetrieverResponder {
    name: String,
    retriever: Retriever,
    responder: Responder,
    top_k: usize,
}

impl RetrieverResponder {
    pub fn new(
        name: impl Into<String>,
        retriever: Retriever,
        responder: Responder,
        top_k: usize,
    ) -> Self {
        Self {
            name: name.into(),
            retriever,
            responder,
            top_k: top_k.max(1),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

#[async_trait]
impl Participant for RetrieverResponder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, query: &str) -> Result<String, OrchestratorError> {
        let context = self.retriever.retrieve(query, self.top_k).await?;
        tracing::debug!(
            participant = %self.name,
            context_chars = context.len(),
            model = self.responder.model_name(),
            "Generating answer"
        );
        let answer = self.responder.respond(query, &context).await?;
        Ok(answer)
    }
}
