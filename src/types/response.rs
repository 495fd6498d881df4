//! What a caller gets back for one query

use serde::{Deserialize, Serialize};

use crate::types::evaluation::Evaluation;
use crate::types::records::{CitedSource, Recommendation};

/// Placeholder answer when generation produced nothing usable
pub const NO_ANSWER: &str = "Sorry, I couldn't generate a proper response.";

/// Answer returned when the generation call fails
pub const GENERATION_FAILED: &str = "An error occurred while generating the answer.";

/// Full response for one query. Every field is always present; absence of
/// content is signalled by empty lists or the placeholder sentences above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub answer: String,
    pub sources: Vec<CitedSource>,
    pub recommendations: Vec<Recommendation>,
    pub evaluation: Evaluation,
    pub context: String,
}

impl Default for RagResponse {
    fn default() -> Self {
        Self {
            answer: NO_ANSWER.to_string(),
            sources: Vec::new(),
            recommendations: Vec::new(),
            evaluation: Evaluation::unavailable(),
            context: String::new(),
        }
    }
}

/// Outcome at the pipeline boundary: a response, or a single error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatOutcome {
    Response(RagResponse),
    Failure { error: String },
}

impl ChatOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        ChatOutcome::Failure {
            error: message.into(),
        }
    }

    pub fn response(&self) -> Option<&RagResponse> {
        match self {
            ChatOutcome::Response(response) => Some(response),
            ChatOutcome::Failure { .. } => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ChatOutcome::Failure { .. })
    }
}
