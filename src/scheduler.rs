use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ConfigurationError, OrchestratorError};
use crate::participant::Participant;

/// One `(input, output)` exchange attributed to a single participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    pub participant_index: usize,
    pub participant: String,
    pub input: String,
    pub output: String,
    pub at: DateTime<Utc>,
    pub latency_ms: u64,
}

/// A turn that produced no answer. The participant fields are `None` when
/// no participant could be selected.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnFailure {
    pub participant_index: Option<usize>,
    pub participant: Option<String>,
    pub error: OrchestratorError,
}

impl From<ConfigurationError> for TurnFailure {
    fn from(err: ConfigurationError) -> Self {
        Self {
            participant_index: None,
            participant: None,
            error: err.into(),
        }
    }
}

/// Round-robin dispatcher over a fixed participant list.
///
/// The cursor is advanced as soon as a participant is selected, so a turn
/// that fails still uses up that participant's slot. Selection and advance
/// happen under one lock; the participant runs outside it.
pub struct TurnScheduler {
    participants: Vec<Arc<dyn Participant>>,
    cursor: Mutex<usize>,
}

impl TurnScheduler {
    pub fn new(participants: Vec<Arc<dyn Participant>>) -> Self {
        Self {
            participants,
            cursor: Mutex::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn cursor(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn participant_names(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|participant| participant.name().to_string())
            .collect()
    }

    fn claim_turn(&self) -> Result<(usize, Arc<dyn Participant>), ConfigurationError> {
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        if self.participants.is_empty() {
            return Err(ConfigurationError::EmptyParticipantSet);
        }
        let index = *cursor;
        *cursor = (index + 1) % self.participants.len();
        Ok((index, Arc::clone(&self.participants[index])))
    }

    pub async fn dispatch_turn(&self, message: &str) -> Result<ConversationTurn, TurnFailure> {
        let (index, participant) = self.claim_turn()?;
        let started = Instant::now();
        tracing::debug!(participant = participant.name(), turn = index, "Dispatching turn");

        match participant.handle(message).await {
            Ok(output) => Ok(ConversationTurn {
                participant_index: index,
                participant: participant.name().to_string(),
                input: message.to_string(),
                output,
                at: Utc::now(),
                latency_ms: started.elapsed().as_millis() as u64,
            }),
            Err(err) => {
                tracing::warn!(
                    participant = participant.name(),
                    turn = index,
                    error = %err,
                    "Turn failed"
                );
                Err(TurnFailure {
                    participant_index: Some(index),
                    participant: Some(participant.name().to_string()),
                    error: err,
                })
            }
        }
    }

    pub async fn dispatch(&self, message: &str) -> Result<String, OrchestratorError> {
        self.dispatch_turn(message)
            .await
            .map(|turn| turn.output)
            .map_err(|failure| failure.error)
    }
}
