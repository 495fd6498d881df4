//! Grounded answer generation
//!
//! The model is told to answer only from the composed context, to cite every
//! claim with the `[Source_N]` identifiers the composer assigned, and to reason
//! about dates relative to today when a question concerns support status.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::services::{ChatRequest, ChatService};
use crate::types::response::GENERATION_FAILED;
use crate::types::SourceMap;

/// Answer generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 800,
        }
    }
}

/// Support tiers the model must classify dated questions into
pub const SUPPORT_TIERS: [&str; 4] = [
    "SUPPORTED",
    "LIMITED SUPPORT",
    "OUT OF SUPPORT",
    "Not Determinable",
];

/// Sentence required when a date needed for classification is missing
pub const NO_DEFINITIVE_ANSWER: &str = "The document does not provide a definitive answer.";

/// Human date used in prompts, e.g. "October 16, 2026"
pub fn format_today(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// System prompt enforcing temporal reasoning, closed-world grounding and citations
pub fn grounding_system_prompt(today: &str) -> String {
    format!(
        r#"You are a factual, grounded assistant. Today is {today}. Answer strictly from the provided context.

TEMPORAL REASONING
When the question involves time, dates, versions or support status:
- Find every date-like string in the context (for example "Oct 2025", "10/2025", "October 1, 2024", "03/23").
- Resolve each one to a calendar date.
- Compare it with today's date ({today}) to decide whether it is in the past or the future.
- Re-read the question: is it about current status, a past point in time, or a future event? Answer that intent, not just the static facts.

SUPPORT STATUS RULES
- End of Active Support and End of Limited Support both before today: {out}.
- End of Active Support before today, End of Limited Support still in the future: {limited}.
- End of Active Support in the future: {supported}.
- Decide from the dates only, never from wording such as "Active Support" that is not backed by a date.
- If any date needed for the decision is missing, classify it as {undetermined} and say: "{no_answer}"

GROUNDING RULES
1. Use only information explicitly stated in the context.
2. Do not add assumptions, inferences or generalizations.
3. Cite every claim with its numbered source identifier in square brackets, exactly as written in the context, for example [Source_1].

FORMAT
- Briefly restate the question.
- Group the answer under {supported}, {limited}, {out}, and {undetermined} when dates are missing.
- Include versions, relevant dates and status.
- Keep the reasoning traceable."#,
        today = today,
        supported = SUPPORT_TIERS[0],
        limited = SUPPORT_TIERS[1],
        out = SUPPORT_TIERS[2],
        undetermined = SUPPORT_TIERS[3],
        no_answer = NO_DEFINITIVE_ANSWER,
    )
}

/// User prompt carrying the context, the citable identifiers, and the question
pub fn answer_user_prompt(query: &str, context: &str, source_map: &SourceMap) -> String {
    let available = if source_map.is_empty() {
        "none".to_string()
    } else {
        source_map
            .ids()
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "### Context:\n{}\n\n### Citable sources:\n{}\n\n### Question:\n{}\nAlso confirm today's date as given in your instructions.\n### Answer:",
        context, available, query
    )
}

/// Answer generator over a [`ChatService`]
pub struct AnswerGenerator {
    chat: Arc<dyn ChatService>,
    model: String,
    config: GenerationConfig,
}

impl AnswerGenerator {
    pub fn new(chat: Arc<dyn ChatService>, model: impl Into<String>) -> Self {
        Self::with_config(chat, model, GenerationConfig::default())
    }

    pub fn with_config(
        chat: Arc<dyn ChatService>,
        model: impl Into<String>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            chat,
            model: model.into(),
            config,
        }
    }

    /// Generate an answer dated today
    pub async fn generate(&self, query: &str, context: &str, source_map: &SourceMap) -> String {
        self.generate_on(Local::now().date_naive(), query, context, source_map)
            .await
    }

    /// Generate an answer as of `today`. A failed call yields the apology sentence.
    pub async fn generate_on(
        &self,
        today: NaiveDate,
        query: &str,
        context: &str,
        source_map: &SourceMap,
    ) -> String {
        let request = ChatRequest {
            system_prompt: grounding_system_prompt(&format_today(today)),
            user_prompt: answer_user_prompt(query, context, source_map),
            model: self.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        match self.chat.complete(&request).await {
            Ok(answer) => {
                let answer = answer.trim().to_string();
                info!(answer_len = answer.len(), "answer generated");
                debug!(preview = %preview(&answer, 100), "answer preview");
                answer
            }
            Err(e) => {
                error!(provider = self.chat.provider(), error = %e, "Failed to generate answer");
                GENERATION_FAILED.to_string()
            }
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }
}

pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
